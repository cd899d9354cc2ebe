//! Integration tests for push/pull against an in-memory remote store.

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::NaiveDate;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use weekly::remote::{HttpRemote, RemoteError, RemoteStore};
use weekly::sync::SyncEngine;
use weekly_core::{
    Collection, Level, NodeData, RecordId, ReportDraft, ReportPatch, Repository, WeeklyError,
};

// =============================================================================
// MOCK REMOTE
// =============================================================================

/// Remote store kept in memory. Upserts start failing once `fail_after`
/// of them have succeeded.
#[derive(Default)]
struct MockRemote {
    records: Mutex<BTreeMap<Collection, BTreeMap<String, Value>>>,
    config: Mutex<Value>,
    raw_listing: Mutex<Option<(Collection, Value)>>,
    fail_after: Mutex<Option<usize>>,
    upserts: AtomicUsize,
}

impl MockRemote {
    fn count(&self, collection: Collection) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    fn record(&self, collection: Collection, id: &RecordId) -> Option<Value> {
        self.records
            .lock()
            .unwrap()
            .get(&collection)
            .and_then(|m| m.get(id.as_str()).cloned())
    }

    fn set_field(&self, collection: Collection, id: &RecordId, field: &str, value: Value) {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&collection)
            .and_then(|m| m.get_mut(id.as_str()))
            .unwrap();
        record[field] = value;
    }

    /// Serve `value` verbatim as the listing of `collection`.
    fn corrupt(&self, collection: Collection, value: Value) {
        *self.raw_listing.lock().unwrap() = Some((collection, value));
    }
}

impl RemoteStore for MockRemote {
    async fn list_all(&self, collection: Collection) -> Result<Value, RemoteError> {
        if let Some((raw, value)) = self.raw_listing.lock().unwrap().as_ref()
            && *raw == collection
        {
            return Ok(value.clone());
        }
        if collection == Collection::Config {
            return Ok(self.config.lock().unwrap().clone());
        }
        let records = self.records.lock().unwrap();
        let list: Vec<Value> = records
            .get(&collection)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        Ok(Value::Array(list))
    }

    async fn get_by_id(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<Value>, RemoteError> {
        Ok(self.record(collection, id))
    }

    async fn upsert(
        &self,
        collection: Collection,
        id: &RecordId,
        record: &Value,
    ) -> Result<(), RemoteError> {
        if let Some(limit) = *self.fail_after.lock().unwrap()
            && self.upserts.load(Ordering::SeqCst) >= limit
        {
            return Err(RemoteError::Status(500, "disk full".to_string()));
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if collection == Collection::Config {
            *self.config.lock().unwrap() = record.clone();
        } else {
            self.records
                .lock()
                .unwrap()
                .entry(collection)
                .or_default()
                .insert(id.to_string(), record.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), RemoteError> {
        self.records
            .lock()
            .unwrap()
            .get_mut(&collection)
            .and_then(|m| m.remove(id.as_str()))
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(format!("/{collection}/{id}")))
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

/// Signed-in admin repository with `n` draft reports.
fn repo_with_reports(n: u32) -> (Repository, Vec<RecordId>) {
    let mut repo = Repository::in_memory();
    repo.login("admin", "admin123").unwrap();
    let ids = (1..=n)
        .map(|d| repo.save_report(None, ReportDraft::for_day(day(d))).unwrap().id)
        .collect();
    (repo, ids)
}

// =============================================================================
// PUSH
// =============================================================================

#[tokio::test]
async fn push_uploads_once_then_nothing() {
    let (repo, _) = repo_with_reports(2);
    let engine = SyncEngine::new(MockRemote::default());

    let first = engine.push(&repo).await.unwrap();
    assert_eq!(first.reports, 2);
    assert_eq!(first.users, 1);
    assert!(!first.config, "untouched catalog must not be uploaded");

    let second = engine.push(&repo).await.unwrap();
    assert_eq!(second.total(), 0);
    assert_eq!(engine.remote().count(Collection::Reports), 2);
}

#[tokio::test]
async fn edited_catalog_is_uploaded_once() {
    let (mut repo, _) = repo_with_reports(0);
    let admin = repo.identity().unwrap();
    repo.config_mut()
        .add_node(&admin, Level::Domain, NodeData::named("Tablets"))
        .unwrap();
    let engine = SyncEngine::new(MockRemote::default());

    assert!(engine.push(&repo).await.unwrap().config);
    assert!(!engine.push(&repo).await.unwrap().config);
    let remote = engine.remote().config.lock().unwrap().clone();
    assert_eq!(remote["domains"][0]["name"], "Tablets");
}

#[tokio::test]
async fn newer_remote_copy_wins() {
    let (mut repo, ids) = repo_with_reports(1);
    let engine = SyncEngine::new(MockRemote::default());
    engine.push(&repo).await.unwrap();

    engine.remote().set_field(
        Collection::Reports,
        &ids[0],
        "updatedAt",
        json!("2999-01-01T00:00:00Z"),
    );
    let patch = ReportPatch {
        end_date: Some(Some(day(2))),
        ..ReportPatch::default()
    };
    repo.update_report(&ids[0], patch).unwrap();

    assert_eq!(engine.push(&repo).await.unwrap().reports, 0);
    let remote = engine.remote().record(Collection::Reports, &ids[0]).unwrap();
    assert_eq!(remote["endDate"], "2024-03-01");
}

#[tokio::test]
async fn newer_local_copy_is_uploaded() {
    let (mut repo, ids) = repo_with_reports(1);
    let engine = SyncEngine::new(MockRemote::default());
    engine.push(&repo).await.unwrap();

    engine.remote().set_field(
        Collection::Reports,
        &ids[0],
        "updatedAt",
        json!("2000-01-01T00:00:00Z"),
    );
    assert_eq!(engine.push(&repo).await.unwrap().reports, 1);
    let patch = ReportPatch {
        end_date: Some(Some(day(4))),
        ..ReportPatch::default()
    };
    repo.update_report(&ids[0], patch).unwrap();
    assert_eq!(engine.push(&repo).await.unwrap().reports, 1);
    let remote = engine.remote().record(Collection::Reports, &ids[0]).unwrap();
    assert_eq!(remote["endDate"], "2024-03-04");
}

#[tokio::test]
async fn push_stops_at_first_failure() {
    let (repo, _) = repo_with_reports(3);
    let remote = MockRemote::default();
    *remote.fail_after.lock().unwrap() = Some(1);
    let engine = SyncEngine::new(remote);

    let err = engine.push(&repo).await.unwrap_err();
    match err {
        WeeklyError::Sync {
            collection,
            record,
            committed,
            message,
        } => {
            assert_eq!(collection, "reports");
            assert!(record.is_some());
            assert_eq!(committed, 1);
            assert!(message.contains("disk full"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.remote().count(Collection::Reports), 1);
    assert_eq!(engine.remote().count(Collection::Users), 0);
}

#[tokio::test]
async fn unreachable_remote_commits_nothing() {
    let (repo, _) = repo_with_reports(1);
    let engine = SyncEngine::new(HttpRemote::new("http://127.0.0.1:9/api", None));
    let err = engine.push(&repo).await.unwrap_err();
    assert!(matches!(err, WeeklyError::Sync { committed: 0, .. }));
}

// =============================================================================
// PULL
// =============================================================================

#[tokio::test]
async fn pull_replaces_local_state() {
    let (source, ids) = repo_with_reports(2);
    let engine = SyncEngine::new(MockRemote::default());
    engine.push(&source).await.unwrap();

    let (mut target, local_ids) = repo_with_reports(1);
    let summary = engine.pull(&mut target).await.unwrap();

    assert_eq!(summary.reports, 2);
    assert_eq!(summary.users, 1);
    assert_eq!(target.reports().len(), 2);
    let admin = target.identity().unwrap();
    assert!(target.reports().find_by_id(&admin, &ids[0]).is_ok());
    assert!(target.reports().find_by_id(&admin, &local_ids[0]).is_err());
}

#[tokio::test]
async fn malformed_listing_leaves_local_state_alone() {
    let (source, _) = repo_with_reports(2);
    let engine = SyncEngine::new(MockRemote::default());
    engine.push(&source).await.unwrap();
    engine
        .remote()
        .corrupt(Collection::Reports, json!({ "reports": [] }));

    let (mut target, local_ids) = repo_with_reports(1);
    let err = engine.pull(&mut target).await.unwrap_err();
    assert!(matches!(err, WeeklyError::Validation(_)));
    assert_eq!(target.reports().len(), 1);
    let admin = target.identity().unwrap();
    assert!(target.reports().find_by_id(&admin, &local_ids[0]).is_ok());
}

#[tokio::test]
async fn invalid_record_aborts_the_whole_pull() {
    let engine = SyncEngine::new(MockRemote::default());
    engine.remote().corrupt(
        Collection::Users,
        json!([{ "id": "u1", "username": "ghost" }]),
    );

    let (mut target, _) = repo_with_reports(1);
    assert!(engine.pull(&mut target).await.is_err());
    assert_eq!(target.reports().len(), 1);
    assert_eq!(target.users().len(), 1);
}

#[tokio::test]
async fn users_without_updated_at_are_pulled() {
    let engine = SyncEngine::new(MockRemote::default());
    engine.remote().corrupt(
        Collection::Users,
        json!([{
            "id": "user-1",
            "username": "admin",
            "password": "admin123",
            "name": "Administrator",
            "role": "admin",
            "email": "",
            "createdAt": "2024-01-02T03:04:05.000Z",
            "lastLogin": null
        }]),
    );

    let (mut target, _) = repo_with_reports(1);
    let summary = engine.pull(&mut target).await.unwrap();
    assert_eq!(summary.users, 1);
    let admin = &target.users().records()[0];
    assert_eq!(admin.updated_at, admin.created_at);
    assert!(target.identity().unwrap().is_admin());
}

// =============================================================================
// SINGLE RECORDS
// =============================================================================

#[tokio::test]
async fn inspect_and_remove_remote_copy() {
    let (repo, ids) = repo_with_reports(1);
    let engine = SyncEngine::new(MockRemote::default());
    engine.push(&repo).await.unwrap();

    let copy = engine.inspect(Collection::Reports, &ids[0]).await.unwrap();
    assert_eq!(copy.unwrap()["id"], ids[0].as_str());

    assert!(engine.remove_remote(Collection::Reports, &ids[0]).await.unwrap());
    assert!(!engine.remove_remote(Collection::Reports, &ids[0]).await.unwrap());
    assert!(
        engine
            .inspect(Collection::Reports, &ids[0])
            .await
            .unwrap()
            .is_none()
    );
}
