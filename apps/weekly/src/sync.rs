//! # Sync Engine
//!
//! Executes push and pull against a `RemoteStore`.
//!
//! ## Push
//!
//! Collections are pushed in a fixed order: reports, users, then config.
//! Within a collection every upload is awaited before the next one starts.
//! The first failure aborts the push with `WeeklyError::Sync`, carrying the
//! number of uploads that were already committed; those stay committed.
//!
//! ## Pull
//!
//! Fetches every synced collection, validates all of it, and only then
//! overwrites local state wholesale and flushes. A malformed or unreachable
//! remote leaves local state untouched. The session is never pulled.

use crate::remote::{RemoteError, RemoteStore};
use serde::Serialize;
use weekly_core::sync::encode_record;
use weekly_core::{
    Collection, ConfigGraph, RecordId, Record, ReportStore, Repository, UserDirectory,
    WeeklyError, config_needs_upload, decode_config, decode_records, plan_upload,
};

/// Counts of what a push uploaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushSummary {
    pub reports: usize,
    pub users: usize,
    pub config: bool,
}

impl PushSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.reports + self.users + usize::from(self.config)
    }
}

/// Counts of what a pull loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullSummary {
    pub reports: usize,
    pub users: usize,
    pub config_nodes: usize,
}

fn sync_error(
    collection: Collection,
    record: Option<&RecordId>,
    committed: usize,
    err: impl std::fmt::Display,
) -> WeeklyError {
    WeeklyError::Sync {
        collection: collection.key(),
        record: record.cloned(),
        committed,
        message: err.to_string(),
    }
}

/// Push/pull executor over one remote.
#[derive(Debug, Clone)]
pub struct SyncEngine<R: RemoteStore> {
    remote: R,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Upload every local record that is newer than (or absent from) the remote.
    pub async fn push(&self, repo: &Repository) -> Result<PushSummary, WeeklyError> {
        let mut committed = 0;
        let reports = self
            .push_collection(repo.reports().records(), &mut committed)
            .await?;
        let users = self
            .push_collection(repo.users().records(), &mut committed)
            .await?;
        let config = self.push_config(repo.config(), committed).await?;

        let summary = PushSummary {
            reports,
            users,
            config,
        };
        tracing::info!(
            reports = summary.reports,
            users = summary.users,
            config = summary.config,
            "push complete"
        );
        Ok(summary)
    }

    async fn push_collection<T: Record>(
        &self,
        local: &[T],
        committed: &mut usize,
    ) -> Result<usize, WeeklyError> {
        let collection = T::COLLECTION;
        let listing = self
            .remote
            .list_all(collection)
            .await
            .map_err(|e| sync_error(collection, None, *committed, e))?;
        let remote: Vec<T> = decode_records(listing)
            .map_err(|e| sync_error(collection, None, *committed, e))?;

        let plan = plan_upload(local, &remote);
        tracing::debug!(collection = %collection, pending = plan.len(), "push plan");

        let mut uploaded = 0;
        for record in plan {
            let id = record.id();
            let body = encode_record(record)?;
            self.remote
                .upsert(collection, id, &body)
                .await
                .map_err(|e| sync_error(collection, Some(id), *committed, e))?;
            *committed += 1;
            uploaded += 1;
        }
        Ok(uploaded)
    }

    async fn push_config(
        &self,
        local: &ConfigGraph,
        committed: usize,
    ) -> Result<bool, WeeklyError> {
        let collection = Collection::Config;
        let remote = self
            .remote
            .list_all(collection)
            .await
            .map_err(|e| sync_error(collection, None, committed, e))?;
        let remote = decode_config(remote)
            .map_err(|e| sync_error(collection, None, committed, e))?;

        if !config_needs_upload(local, remote.as_ref()) {
            return Ok(false);
        }
        let body = encode_record(local)?;
        self.remote
            .upsert(collection, &RecordId::new(collection.key()), &body)
            .await
            .map_err(|e| sync_error(collection, None, committed, e))?;
        Ok(true)
    }

    /// Replace local users, reports and config with the remote copies.
    pub async fn pull(&self, repo: &mut Repository) -> Result<PullSummary, WeeklyError> {
        let users = self.fetch(Collection::Users).await?;
        let reports = self.fetch(Collection::Reports).await?;
        let config = self.fetch(Collection::Config).await?;

        let users = UserDirectory::from_records(decode_records(users)?)?;
        let reports = ReportStore::from_records(decode_records(reports)?)?;
        let config = decode_config(config)?.unwrap_or_default();

        let summary = PullSummary {
            reports: reports.len(),
            users: users.len(),
            config_nodes: config.node_count(),
        };
        repo.replace_synced(users, reports, config);
        repo.flush()?;
        tracing::info!(
            reports = summary.reports,
            users = summary.users,
            config_nodes = summary.config_nodes,
            "pull complete"
        );
        Ok(summary)
    }

    async fn fetch(&self, collection: Collection) -> Result<serde_json::Value, WeeklyError> {
        self.remote
            .list_all(collection)
            .await
            .map_err(|e| sync_error(collection, None, 0, e))
    }

    /// The remote copy of one record, if any.
    pub async fn inspect(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<serde_json::Value>, WeeklyError> {
        self.remote
            .get_by_id(collection, id)
            .await
            .map_err(|e| sync_error(collection, Some(id), 0, e))
    }

    /// Delete the remote copy of one record. Missing records are not an error.
    pub async fn remove_remote(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<bool, WeeklyError> {
        match self.remote.delete(collection, id).await {
            Ok(()) => Ok(true),
            Err(RemoteError::NotFound(_)) => Ok(false),
            Err(e) => Err(sync_error(collection, Some(id), 0, e)),
        }
    }
}
