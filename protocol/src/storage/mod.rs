//! # Storage Module
//!
//! Everything VaultBank persists goes through a [`Store`]: a byte-keyed map
//! with atomic batch writes. Logic revisions never own their storage. They
//! read and write stable keys (see [`keys`]) whose shape is pinned by the
//! versioned [`layout`], which is what lets a later revision run over data an
//! earlier revision wrote.
//!
//! ## Architecture
//!
//! ```text
//! memory.rs: MemoryStore: BTreeMap behind a RwLock (tests, ephemeral runs)
//! db.rs    : SledStore: one sled tree per contract namespace
//! keys.rs  : stable key encoding for roles, pause flag, ledger, nonces
//! layout.rs: versioned slot layouts, compatibility and fingerprints
//! state.rs : StateTx overlay: staged writes, flush with undo, rollback
//! ```
//!
//! ## Encoding
//!
//! Values are bincode. Keys are raw bytes: a slot prefix followed by
//! fixed-width address bytes, so prefix scans enumerate a slot exactly.

pub mod db;
pub mod keys;
pub mod layout;
pub mod memory;
pub mod state;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use db::SledStore;
pub use layout::{LayoutError, LogicVersion, StorageLayout};
pub use memory::MemoryStore;
pub use state::{Snapshot, StateTx, StateView};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// WriteBatch
// ---------------------------------------------------------------------------

/// An ordered set of writes applied atomically by [`Store::apply`].
///
/// `None` values are deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push((key.into(), Some(value.into())));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push((key.into(), None));
    }

    pub(crate) fn push(&mut self, key: Vec<u8>, value: Option<Vec<u8>>) {
        self.ops.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Option<&[u8]>)> {
        self.ops
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_deref()))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A byte-keyed store with atomic batch writes.
///
/// Implementations must make [`apply`](Store::apply) all-or-nothing: a
/// reader never observes half a batch.
pub trait Store: Send + Sync {
    /// Reads a single key.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Returns every `(key, value)` whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Applies a batch atomically.
    fn apply(&self, batch: &WriteBatch) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Value codec
// ---------------------------------------------------------------------------

/// Encodes a value for storage.
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decodes a stored value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}
