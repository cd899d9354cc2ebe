//! # Snapshot Storage
//!
//! Local persistence is a key/value store of whole-collection snapshots:
//! one JSON document per `Collection`. Two backends implement it:
//! - `MemoryStore`: a map in memory (tests, ephemeral runs)
//! - `RedbStore`: a redb database file (ACID, crash safe)
//!
//! `StorageBackend` wraps either one behind the same trait.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::WeeklyError;
use std::fmt;

/// A persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Users,
    Reports,
    Config,
    /// The signed-in identity. Never synced.
    Session,
}

impl Collection {
    /// Storage key, also the remote collection name.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Reports => "reports",
            Self::Config => "config",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Byte-level snapshot store.
pub trait SnapshotStore {
    /// Read a snapshot. `None` if it was never written.
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, WeeklyError>;

    /// Replace a snapshot.
    fn write(&mut self, collection: Collection, bytes: &[u8]) -> Result<(), WeeklyError>;

    /// Delete a snapshot. Missing snapshots are not an error.
    fn remove(&mut self, collection: Collection) -> Result<(), WeeklyError>;

    /// Replace several snapshots. Backends that support transactions apply
    /// the whole batch atomically.
    fn write_batch(&mut self, entries: &[(Collection, Vec<u8>)]) -> Result<(), WeeklyError> {
        for (collection, bytes) in entries {
            self.write(*collection, bytes)?;
        }
        Ok(())
    }
}

/// Storage backend of a `Repository`.
#[derive(Debug)]
pub enum StorageBackend {
    /// Volatile map.
    InMemory(MemoryStore),
    /// Disk-backed redb database.
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

impl SnapshotStore for StorageBackend {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, WeeklyError> {
        match self {
            Self::InMemory(store) => store.read(collection),
            Self::Persistent(store) => store.read(collection),
        }
    }

    fn write(&mut self, collection: Collection, bytes: &[u8]) -> Result<(), WeeklyError> {
        match self {
            Self::InMemory(store) => store.write(collection, bytes),
            Self::Persistent(store) => store.write(collection, bytes),
        }
    }

    fn remove(&mut self, collection: Collection) -> Result<(), WeeklyError> {
        match self {
            Self::InMemory(store) => store.remove(collection),
            Self::Persistent(store) => store.remove(collection),
        }
    }

    fn write_batch(&mut self, entries: &[(Collection, Vec<u8>)]) -> Result<(), WeeklyError> {
        match self {
            Self::InMemory(store) => store.write_batch(entries),
            Self::Persistent(store) => store.write_batch(entries),
        }
    }
}
