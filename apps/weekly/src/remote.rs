//! # Remote Collection Store
//!
//! The remote side of sync: an opaque per-collection CRUD service.
//!
//! ## HTTP Mapping
//!
//! | Operation  | Records (`users`, `reports`)          | Config            |
//! |------------|---------------------------------------|-------------------|
//! | list_all   | `GET /{collection}`                   | `GET /config`     |
//! | get_by_id  | `GET /{collection}/{id}` (404 = none) | `GET /config`     |
//! | upsert     | `PUT /{collection}/{id}`, `POST` on 404 | `PUT /config`   |
//! | delete     | `DELETE /{collection}/{id}`           | unsupported       |
//!
//! Error bodies of the form `{"error": "..."}` are surfaced as the message.

use serde_json::Value;
use std::future::Future;
use weekly_core::{Collection, RecordId};

/// Errors from the remote store.
#[derive(Debug)]
pub enum RemoteError {
    /// Cannot reach the remote service.
    ConnectionFailed(String),
    /// 401 Unauthorized - invalid or missing API key.
    Unauthorized,
    /// The addressed record or route does not exist.
    NotFound(String),
    /// Any other non-success status.
    Status(u16, String),
    /// Failed to parse or build a body.
    ParseError(String),
    /// The collection does not support the operation.
    Unsupported(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(url) => write!(f, "Cannot connect to remote at {url}"),
            Self::Unauthorized => write!(f, "Unauthorized: invalid or missing API key"),
            Self::NotFound(path) => write!(f, "Not found: {path}"),
            Self::Status(status, msg) => write!(f, "Remote error ({status}): {msg}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::Unsupported(msg) => write!(f, "Unsupported: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Per-collection CRUD access to the remote store.
///
/// Records travel as JSON values; decoding and validation happen in the
/// caller.
pub trait RemoteStore: Send + Sync {
    /// Every record of a collection (an array), or the config document.
    fn list_all(
        &self,
        collection: Collection,
    ) -> impl Future<Output = Result<Value, RemoteError>> + Send;

    /// One record, `None` if the remote has no record with that id.
    fn get_by_id(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> impl Future<Output = Result<Option<Value>, RemoteError>> + Send;

    /// Create or replace one record (or the config document).
    fn upsert(
        &self,
        collection: Collection,
        id: &RecordId,
        record: &Value,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Delete one record.
    fn delete(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

// =============================================================================
// HTTP IMPLEMENTATION
// =============================================================================

/// `RemoteStore` over HTTP/JSON.
#[derive(Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

/// Path of a collection or of one record in it.
fn record_path(collection: Collection, id: Option<&RecordId>) -> String {
    match (collection, id) {
        (Collection::Config, _) | (_, None) => format!("/{}", collection.key()),
        (_, Some(id)) => format!("/{}/{}", collection.key(), id),
    }
}

/// Message from an `{"error": "..."}` body, or the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

impl HttpRemote {
    /// Create a client for the service rooted at `base_url`.
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional Bearer auth.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Send a request and handle connection errors.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        req.send()
            .await
            .map_err(|e| RemoteError::ConnectionFailed(format!("{}: {e}", self.base_url)))
    }

    /// Map error statuses to `RemoteError`, pass successes through.
    async fn check(
        &self,
        resp: reqwest::Response,
        path: &str,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RemoteError::Unauthorized);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(path.to_string()));
        }
        let body = resp.text().await.unwrap_or_default();
        Err(RemoteError::Status(status.as_u16(), error_message(&body)))
    }

    async fn get_json(&self, path: &str) -> Result<Value, RemoteError> {
        let resp = self
            .send(self.request(reqwest::Method::GET, path))
            .await?;
        let resp = self.check(resp, path).await?;
        resp.json::<Value>()
            .await
            .map_err(|e| RemoteError::ParseError(e.to_string()))
    }

    async fn write_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &Value,
    ) -> Result<(), RemoteError> {
        let resp = self.send(self.request(method, path).json(body)).await?;
        self.check(resp, path).await.map(|_| ())
    }
}

impl RemoteStore for HttpRemote {
    async fn list_all(&self, collection: Collection) -> Result<Value, RemoteError> {
        self.get_json(&record_path(collection, None)).await
    }

    async fn get_by_id(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<Value>, RemoteError> {
        match self.get_json(&record_path(collection, Some(id))).await {
            Ok(value) => Ok(Some(value)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn upsert(
        &self,
        collection: Collection,
        id: &RecordId,
        record: &Value,
    ) -> Result<(), RemoteError> {
        let path = record_path(collection, Some(id));
        match self.write_json(reqwest::Method::PUT, &path, record).await {
            Err(RemoteError::NotFound(_)) if collection != Collection::Config => {
                tracing::debug!(collection = %collection, id = %id, "PUT missed, creating with POST");
                self.write_json(
                    reqwest::Method::POST,
                    &record_path(collection, None),
                    record,
                )
                .await
            }
            other => other,
        }
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), RemoteError> {
        if collection == Collection::Config {
            return Err(RemoteError::Unsupported(
                "the config document cannot be deleted".to_string(),
            ));
        }
        let path = record_path(collection, Some(id));
        let resp = self
            .send(self.request(reqwest::Method::DELETE, &path))
            .await?;
        self.check(resp, &path).await.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_the_collection_layout() {
        let id = RecordId::new("r-1");
        assert_eq!(record_path(Collection::Reports, None), "/reports");
        assert_eq!(record_path(Collection::Reports, Some(&id)), "/reports/r-1");
        assert_eq!(record_path(Collection::Users, Some(&id)), "/users/r-1");
        assert_eq!(record_path(Collection::Config, Some(&id)), "/config");
    }

    #[test]
    fn error_bodies_are_unwrapped() {
        assert_eq!(error_message(r#"{"error":"Report not found"}"#), "Report not found");
        assert_eq!(error_message(" plain failure \n"), "plain failure");
    }

    #[test]
    fn base_url_is_normalised_and_key_hidden() {
        let remote = HttpRemote::new("http://localhost:3000/api/", Some("secret".to_string()));
        assert_eq!(remote.base_url(), "http://localhost:3000/api");
        assert!(!format!("{remote:?}").contains("secret"));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_connection_error() {
        let remote = HttpRemote::new("http://127.0.0.1:9", None);
        let err = remote.list_all(Collection::Reports).await.unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionFailed(_)));
    }
}
