//! In-memory [`Store`] for tests and ephemeral deployments.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{Store, StoreResult, WriteBatch};

/// A `BTreeMap` behind a `RwLock`. Batches are applied under a single write
/// lock, so they are atomic with respect to readers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn apply(&self, batch: &WriteBatch) -> StoreResult<()> {
        let mut entries = self.entries.write();
        for (key, value) in batch.iter() {
            match value {
                Some(v) => {
                    entries.insert(key.to_vec(), v.to_vec());
                }
                None => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}
