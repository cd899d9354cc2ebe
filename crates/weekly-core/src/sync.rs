//! # Sync Planning
//!
//! The pure half of remote synchronization: decoding remote payloads and
//! deciding what to upload. The network half lives in the application.
//!
//! ## Push Rule (last write wins)
//!
//! A local record is uploaded when no remote record has its id, or when its
//! `updatedAt` is strictly newer than the remote copy. Equal timestamps are
//! not re-uploaded, so pushing twice in a row uploads nothing the second time.
//! Remote-only records are left alone; deletes are never propagated.
//!
//! The configuration catalog is one document and is uploaded wholesale when
//! its `updatedAt` is newer than the remote's, or the remote has none.

use crate::config_graph::ConfigGraph;
use crate::storage::Collection;
use crate::{RecordId, Report, User, WeeklyError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// A record type synced one record at a time.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> &RecordId;

    fn updated_at(&self) -> DateTime<Utc>;
}

impl Record for Report {
    const COLLECTION: Collection = Collection::Reports;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Local records that must be uploaded, in local order.
#[must_use]
pub fn plan_upload<'a, T: Record>(local: &'a [T], remote: &[T]) -> Vec<&'a T> {
    let remote_stamps: HashMap<&RecordId, DateTime<Utc>> =
        remote.iter().map(|r| (r.id(), r.updated_at())).collect();
    local
        .iter()
        .filter(|record| {
            remote_stamps
                .get(record.id())
                .is_none_or(|&theirs| record.updated_at() > theirs)
        })
        .collect()
}

/// Whether the local catalog must replace the remote one.
///
/// A catalog that was never edited locally is not uploaded.
#[must_use]
pub fn config_needs_upload(local: &ConfigGraph, remote: Option<&ConfigGraph>) -> bool {
    match (
        local.updated_at(),
        remote.and_then(ConfigGraph::updated_at),
    ) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(ours), Some(theirs)) => ours > theirs,
    }
}

/// Decode a remote collection listing into typed records.
///
/// The payload must be a JSON array; any malformed element rejects the whole
/// listing with a `Validation` error naming its index.
pub fn decode_records<T: Record>(payload: serde_json::Value) -> Result<Vec<T>, WeeklyError> {
    let serde_json::Value::Array(items) = payload else {
        return Err(WeeklyError::Validation(format!(
            "remote {} listing is not an array",
            T::COLLECTION
        )));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                WeeklyError::Validation(format!(
                    "malformed remote {} record at index {index}: {e}",
                    T::COLLECTION
                ))
            })
        })
        .collect()
}

/// Decode the remote catalog document. `null` or an empty body means none.
pub fn decode_config(payload: serde_json::Value) -> Result<Option<ConfigGraph>, WeeklyError> {
    if payload.is_null() {
        return Ok(None);
    }
    ConfigGraph::from_json(payload).map(Some)
}

/// Serialize a record for upload.
pub fn encode_record<T: Serialize>(record: &T) -> Result<serde_json::Value, WeeklyError> {
    serde_json::to_value(record).map_err(|e| WeeklyError::Serialization(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config_graph::NodeData;
    use crate::{Identity, Level, ReportStatus, Role, Selection};
    use chrono::Duration;

    fn report(id: &str, updated_at: DateTime<Utc>) -> Report {
        Report {
            id: RecordId::new(id),
            user_id: RecordId::new("u"),
            selection: Selection::default(),
            start_date: None,
            end_date: None,
            content: Vec::new(),
            status: ReportStatus::Draft,
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn last_write_wins_selection() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(1);
        let local = vec![report("r1", t1), report("r2", t0), report("r3", t0)];
        let remote = vec![report("r1", t0), report("r2", t1), report("r4", t0)];
        let ids: Vec<&str> = plan_upload(&local, &remote)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["r1", "r3"]);
    }

    #[test]
    fn equal_timestamps_are_not_uploaded() {
        let t = Utc::now();
        let local = vec![report("r1", t)];
        assert!(plan_upload(&local, &local.clone()).is_empty());
    }

    #[test]
    fn empty_remote_uploads_everything() {
        let t = Utc::now();
        let local = vec![report("r1", t), report("r2", t)];
        assert_eq!(plan_upload(&local, &[]).len(), 2);
    }

    #[test]
    fn config_upload_rule() {
        let admin = Identity {
            user_id: RecordId::new("a"),
            username: "a".to_string(),
            name: "A".to_string(),
            role: Role::Admin,
        };
        let untouched = ConfigGraph::new();
        assert!(!config_needs_upload(&untouched, None));

        let mut edited = ConfigGraph::new();
        edited
            .add_node(&admin, Level::Domain, NodeData::named("Phones"))
            .unwrap();
        assert!(config_needs_upload(&edited, None));
        assert!(config_needs_upload(&edited, Some(&untouched)));
        assert!(!config_needs_upload(&edited, Some(&edited.clone())));
    }

    #[test]
    fn decoding_rejects_bad_payloads() {
        let err = decode_records::<Report>(serde_json::json!({"error": "nope"})).unwrap_err();
        assert!(matches!(err, WeeklyError::Validation(_)));

        let good = encode_record(&report("r1", Utc::now())).unwrap();
        let err = decode_records::<Report>(serde_json::json!([good, {"id": 3}])).unwrap_err();
        assert!(err.to_string().contains("index 1"));

        assert!(decode_config(serde_json::Value::Null).unwrap().is_none());
    }
}
