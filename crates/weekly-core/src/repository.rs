//! # Repository
//!
//! The single owner of all local state: users, reports, the configuration
//! catalog and the active session, plus the storage backend they are
//! persisted to.
//!
//! ## Persistence Model
//!
//! State lives in memory. `reload` replaces it from the backend snapshots,
//! validating every record; `flush` writes all four snapshots back in one
//! batch. Callers flush after each successful mutation.

use crate::auth::AuthGate;
use crate::config_graph::ConfigGraph;
use crate::export::Labels;
use crate::report_store::ReportStore;
use crate::storage::{Collection, RedbStore, SnapshotStore, StorageBackend};
use crate::users::UserDirectory;
use crate::{Identity, RecordId, Report, ReportDraft, ReportPatch, User, WeeklyError};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

fn decode<T: DeserializeOwned>(collection: Collection, bytes: &[u8]) -> Result<T, WeeklyError> {
    serde_json::from_slice(bytes)
        .map_err(|e| WeeklyError::Validation(format!("malformed {collection} snapshot: {e}")))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, WeeklyError> {
    serde_json::to_vec(value).map_err(|e| WeeklyError::Serialization(e.to_string()))
}

#[derive(Debug, Default)]
pub struct Repository {
    backend: StorageBackend,
    users: UserDirectory,
    reports: ReportStore,
    config: ConfigGraph,
    auth: AuthGate,
}

impl Repository {
    /// A repository over a fresh in-memory backend, seeded with the default admin.
    #[must_use]
    pub fn in_memory() -> Self {
        let mut repo = Self::default();
        repo.users.ensure_default_admin(Utc::now());
        repo
    }

    /// Open (or create) a redb database file and load its snapshots.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WeeklyError> {
        let store = RedbStore::open(path)?;
        Self::with_backend(StorageBackend::Persistent(store))
    }

    /// Load state from an existing backend.
    pub fn with_backend(backend: StorageBackend) -> Result<Self, WeeklyError> {
        let mut repo = Self {
            backend,
            ..Self::default()
        };
        repo.reload()?;
        Ok(repo)
    }

    /// Replace in-memory state with the backend snapshots.
    ///
    /// Missing snapshots load as empty; an empty user directory is seeded with
    /// the default admin. Nothing changes if any snapshot is malformed.
    pub fn reload(&mut self) -> Result<(), WeeklyError> {
        let users: Vec<User> = match self.backend.read(Collection::Users)? {
            Some(bytes) => decode(Collection::Users, &bytes)?,
            None => Vec::new(),
        };
        let reports: Vec<Report> = match self.backend.read(Collection::Reports)? {
            Some(bytes) => decode(Collection::Reports, &bytes)?,
            None => Vec::new(),
        };
        let config = match self.backend.read(Collection::Config)? {
            Some(bytes) => ConfigGraph::from_json(decode(Collection::Config, &bytes)?)?,
            None => ConfigGraph::new(),
        };
        let session: Option<Identity> = match self.backend.read(Collection::Session)? {
            Some(bytes) => decode(Collection::Session, &bytes)?,
            None => None,
        };

        let mut users = UserDirectory::from_records(users)?;
        let reports = ReportStore::from_records(reports)?;
        users.ensure_default_admin(Utc::now());

        self.users = users;
        self.reports = reports;
        self.config = config;
        self.auth = AuthGate::with_session(session);
        self.auth.revalidate(&self.users);
        Ok(())
    }

    /// Write every snapshot to the backend in one batch.
    ///
    /// The session is re-resolved against the directory first, so account
    /// edits made since login are what gets persisted.
    pub fn flush(&mut self) -> Result<(), WeeklyError> {
        self.auth.revalidate(&self.users);
        let batch = vec![
            (Collection::Users, encode(self.users.records())?),
            (Collection::Reports, encode(self.reports.records())?),
            (Collection::Config, encode(&self.config)?),
            (Collection::Session, encode(&self.auth.current())?),
        ];
        self.backend.write_batch(&batch)
    }

    /// Overwrite the synced collections wholesale.
    ///
    /// The session survives only if its account is in the new directory,
    /// with the role stored there.
    pub fn replace_synced(
        &mut self,
        users: UserDirectory,
        reports: ReportStore,
        config: ConfigGraph,
    ) {
        self.users = users;
        self.reports = reports;
        self.config = config;
        self.auth.revalidate(&self.users);
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    #[must_use]
    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn users_mut(&mut self) -> &mut UserDirectory {
        &mut self.users
    }

    #[must_use]
    pub fn reports(&self) -> &ReportStore {
        &self.reports
    }

    pub fn reports_mut(&mut self) -> &mut ReportStore {
        &mut self.reports
    }

    #[must_use]
    pub fn config(&self) -> &ConfigGraph {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigGraph {
        &mut self.config
    }

    #[must_use]
    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    /// Name resolver over the current catalog and directory.
    #[must_use]
    pub fn labels(&self) -> Labels<'_> {
        Labels::new(&self.config, &self.users)
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    pub fn login(&mut self, username: &str, password: &str) -> Result<Identity, WeeklyError> {
        self.auth
            .login(&mut self.users, username, password, Utc::now())
    }

    pub fn logout(&mut self) -> Option<Identity> {
        self.auth.logout()
    }

    /// Clone of the signed-in identity.
    pub fn identity(&self) -> Result<Identity, WeeklyError> {
        self.auth.require_login().cloned()
    }

    // =========================================================================
    // REPORTS (as the signed-in identity)
    // =========================================================================

    /// Create a report, or update `existing`, from a full draft.
    pub fn save_report(
        &mut self,
        existing: Option<&RecordId>,
        draft: ReportDraft,
    ) -> Result<Report, WeeklyError> {
        let identity = self.identity()?;
        match existing {
            Some(id) => {
                self.reports
                    .update(&identity, id, ReportPatch::from(draft), &self.config)
            }
            None => self.reports.create(&identity, draft, &self.config),
        }
    }

    pub fn update_report(
        &mut self,
        id: &RecordId,
        patch: ReportPatch,
    ) -> Result<Report, WeeklyError> {
        let identity = self.identity()?;
        self.reports.update(&identity, id, patch, &self.config)
    }

    pub fn delete_report(&mut self, id: &RecordId) -> Result<Report, WeeklyError> {
        let identity = self.identity()?;
        self.reports.delete(&identity, id)
    }
}
