//! # redb-backed Snapshot Storage
//!
//! Stores each collection snapshot as one value in a redb table, giving:
//! - ACID transactions (a batch of snapshots commits together)
//! - Crash safety (copy-on-write B-trees)
//! - Zero configuration

use super::{Collection, SnapshotStore};
use crate::WeeklyError;
use redb::{Database, ReadableDatabase, TableDefinition};
use std::path::Path;

/// Table for snapshots: collection key -> JSON bytes
const SNAPSHOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

fn io<E: std::fmt::Display>(e: E) -> WeeklyError {
    WeeklyError::Storage(e.to_string())
}

/// A disk-backed snapshot store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WeeklyError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        // Initialize the table so reads on a fresh file succeed
        {
            let write_txn = db.begin_write().map_err(io)?;
            let _ = write_txn.open_table(SNAPSHOTS).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        Ok(Self { db })
    }
}

impl SnapshotStore for RedbStore {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, WeeklyError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(SNAPSHOTS).map_err(io)?;
        Ok(table
            .get(collection.key())
            .map_err(io)?
            .map(|v| v.value().to_vec()))
    }

    fn write(&mut self, collection: Collection, bytes: &[u8]) -> Result<(), WeeklyError> {
        self.write_batch(&[(collection, bytes.to_vec())])
    }

    fn remove(&mut self, collection: Collection) -> Result<(), WeeklyError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(SNAPSHOTS).map_err(io)?;
            table.remove(collection.key()).map_err(io)?;
        }
        write_txn.commit().map_err(io)
    }

    fn write_batch(&mut self, entries: &[(Collection, Vec<u8>)]) -> Result<(), WeeklyError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(SNAPSHOTS).map_err(io)?;
            for (collection, bytes) in entries {
                table
                    .insert(collection.key(), bytes.as_slice())
                    .map_err(io)?;
            }
        }
        write_txn.commit().map_err(io)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn snapshots_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("weekly.redb");
        {
            let mut store = RedbStore::open(&path).unwrap();
            store
                .write_batch(&[
                    (Collection::Users, b"[1]".to_vec()),
                    (Collection::Reports, b"[2]".to_vec()),
                ])
                .unwrap();
        }
        let mut store = RedbStore::open(&path).unwrap();
        assert_eq!(
            store.read(Collection::Users).unwrap().as_deref(),
            Some(&b"[1]"[..])
        );
        assert_eq!(
            store.read(Collection::Reports).unwrap().as_deref(),
            Some(&b"[2]"[..])
        );
        assert!(store.read(Collection::Config).unwrap().is_none());

        store.remove(Collection::Users).unwrap();
        assert!(store.read(Collection::Users).unwrap().is_none());
    }

    #[test]
    fn write_replaces_previous_value() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("w.redb")).unwrap();
        store.write(Collection::Config, b"{}").unwrap();
        store.write(Collection::Config, b"{\"a\":1}").unwrap();
        assert_eq!(
            store.read(Collection::Config).unwrap().as_deref(),
            Some(&b"{\"a\":1}"[..])
        );
    }
}
