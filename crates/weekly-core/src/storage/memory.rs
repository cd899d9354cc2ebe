use super::{Collection, SnapshotStore};
use crate::WeeklyError;
use std::collections::BTreeMap;

/// In-memory snapshot store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Collection, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, WeeklyError> {
        Ok(self.entries.get(&collection).cloned())
    }

    fn write(&mut self, collection: Collection, bytes: &[u8]) -> Result<(), WeeklyError> {
        self.entries.insert(collection, bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, collection: Collection) -> Result<(), WeeklyError> {
        self.entries.remove(&collection);
        Ok(())
    }
}
