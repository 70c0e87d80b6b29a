//! # SledStore: Persistent Storage Engine
//!
//! The on-disk [`Store`], built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! One sled database holds every contract a node runs. Each contract gets a
//! named tree (its *namespace*), so the bank, the native coin and each token
//! have independent keyspaces that cannot collide:
//!
//! | Tree           | Owner                     |
//! |----------------|---------------------------|
//! | `bank`         | the proxy and its ledger  |
//! | `coin`         | native coin balances      |
//! | `token-<addr>` | one tree per token        |
//!
//! ## Atomicity
//!
//! A [`WriteBatch`] becomes a single sled `Batch` applied to one tree, then
//! the database is flushed. Either every write in the batch lands on disk
//! or none does.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::{Store, StoreResult, WriteBatch};

/// Namespace used when a store is opened without naming one.
const DEFAULT_NAMESPACE: &str = "bank";

/// A sled tree exposed as a [`Store`].
///
/// Cloning is cheap: sled handles are reference counted and thread-safe,
/// so clones can be shared across threads without extra locking.
#[derive(Debug, Clone)]
pub struct SledStore {
    /// The underlying sled database handle.
    db: Db,
    /// The tree this store reads and writes.
    tree: Tree,
}

impl SledStore {
    /// Open or create a database at `path`, bound to the default namespace.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db, DEFAULT_NAMESPACE)
    }

    /// Create a temporary database that is removed when the last handle
    /// is dropped. Intended for tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, DEFAULT_NAMESPACE)
    }

    fn from_db(db: Db, namespace: &str) -> StoreResult<Self> {
        let tree = db.open_tree(namespace)?;
        Ok(Self { db, tree })
    }

    /// Another store over the same database, bound to the tree `name`.
    /// The tree is created if it doesn't exist.
    pub fn namespace(&self, name: &str) -> StoreResult<Self> {
        Self::from_db(self.db.clone(), name)
    }

    /// Names of every tree in the database, excluding sled's internal one.
    pub fn namespaces(&self) -> Vec<String> {
        self.db
            .tree_names()
            .into_iter()
            .filter_map(|name| String::from_utf8(name.to_vec()).ok())
            .filter(|name| name != "__sled__default")
            .collect()
    }

    /// Flush all dirty buffers to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Approximate on-disk size in bytes.
    pub fn size_on_disk(&self) -> StoreResult<u64> {
        Ok(self.db.size_on_disk()?)
    }
}

impl Store for SledStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        for item in self.tree.scan_prefix(prefix) {
            let (k, v) = item?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }

    fn apply(&self, batch: &WriteBatch) -> StoreResult<()> {
        let mut sled_batch = Batch::default();
        for (key, value) in batch.iter() {
            match value {
                Some(v) => sled_batch.insert(key, v),
                None => sled_batch.remove(key),
            }
        }
        self.tree.apply_batch(sled_batch)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_temporary_starts_empty() {
        let store = SledStore::open_temporary().unwrap();
        assert_eq!(store.get(b"anything").unwrap(), None);
        assert!(store.scan_prefix(b"").unwrap().is_empty());
    }

    #[test]
    fn batch_applies_puts_and_deletes() {
        let store = SledStore::open_temporary().unwrap();
        let mut batch = WriteBatch::new();
        batch.put(b"ledger/a".to_vec(), b"1".to_vec());
        batch.put(b"ledger/b".to_vec(), b"2".to_vec());
        store.apply(&batch).unwrap();

        let mut del = WriteBatch::new();
        del.delete(b"ledger/a".to_vec());
        store.apply(&del).unwrap();

        let all = store.scan_prefix(b"ledger/").unwrap();
        assert_eq!(all, vec![(b"ledger/b".to_vec(), b"2".to_vec())]);
    }

    #[test]
    fn namespaces_are_isolated() {
        let bank = SledStore::open_temporary().unwrap();
        let coin = bank.namespace("coin").unwrap();

        let mut batch = WriteBatch::new();
        batch.put(b"key".to_vec(), b"bank".to_vec());
        bank.apply(&batch).unwrap();

        assert_eq!(coin.get(b"key").unwrap(), None);
        assert!(bank.namespaces().contains(&"coin".to_string()));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            let mut batch = WriteBatch::new();
            batch.put(b"roles/owner".to_vec(), b"o".to_vec());
            store.apply(&batch).unwrap();
        }
        let reopened = SledStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(b"roles/owner").unwrap(), Some(b"o".to_vec()));
    }
}
