//! # Call State -- Write Overlay with Undo
//!
//! Every bank entry point runs against a [`StateTx`]: writes are staged in
//! an in-memory overlay and reads see the overlay first, then the store.
//! Nothing touches the store until the call decides to.
//!
//! ## Lifecycle
//!
//! ```text
//! stage writes ──► flush() ──► (outbound value movement) ──► commit()
//!                    │                                          │
//!                    └─ records an undo batch                   └─ undo discarded
//!
//! any failure ──► rollback(): pending dropped, undo batches applied newest first
//! ```
//!
//! `flush()` exists for debit-before-send: the debit must be durable and
//! visible to any reentrant reader before value leaves custody. If the send
//! then fails, the undo batch restores the exact pre-flush bytes.
//!
//! A `StateTx` dropped without `commit()` rolls itself back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error};

use super::{decode, encode, Store, StoreResult, WriteBatch};

// ---------------------------------------------------------------------------
// StateView
// ---------------------------------------------------------------------------

/// Read access to bank state, either committed or through an overlay.
pub trait StateView {
    fn read(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Every live `(key, value)` under `prefix`, in key order.
    fn scan(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Reads and decodes a typed value.
    fn load<T: DeserializeOwned>(&self, key: &[u8]) -> StoreResult<Option<T>>
    where
        Self: Sized,
    {
        match self.read(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// Read-only view of what is committed in a store.
#[derive(Clone, Copy)]
pub struct Snapshot<'s> {
    store: &'s dyn Store,
}

impl<'s> Snapshot<'s> {
    pub fn new(store: &'s dyn Store) -> Self {
        Self { store }
    }
}

impl StateView for Snapshot<'_> {
    fn read(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.store.get(key)
    }

    fn scan(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.store.scan_prefix(prefix)
    }
}

// ---------------------------------------------------------------------------
// StateTx
// ---------------------------------------------------------------------------

/// A write overlay over a [`Store`] for the duration of one call.
pub struct StateTx<'s> {
    store: &'s dyn Store,
    /// Staged writes; `None` is a deletion.
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    /// One undo batch per flush, oldest first.
    undo: Vec<WriteBatch>,
}

impl<'s> StateTx<'s> {
    pub fn new(store: &'s dyn Store) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
            undo: Vec::new(),
        }
    }

    /// Stages a typed value.
    pub fn save<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> StoreResult<()> {
        let bytes = encode(value)?;
        self.pending.insert(key, Some(bytes));
        Ok(())
    }

    /// Stages a deletion.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.pending.insert(key, None);
    }

    /// Number of staged, unflushed writes.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Writes every staged change to the store as one atomic batch and
    /// records how to undo it.
    pub fn flush(&mut self) -> StoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::new();
        let mut undo = WriteBatch::new();
        for (key, value) in &self.pending {
            undo.push(key.clone(), self.store.get(key)?);
            batch.push(key.clone(), value.clone());
        }

        self.store.apply(&batch)?;
        debug!(writes = batch.len(), "state flushed");
        self.pending.clear();
        self.undo.push(undo);
        Ok(())
    }

    /// Flushes remaining writes and forgets the undo history.
    pub fn commit(mut self) -> StoreResult<()> {
        self.flush()?;
        self.undo.clear();
        Ok(())
    }

    /// Drops staged writes and reverts every flush, newest first.
    pub fn rollback(mut self) -> StoreResult<()> {
        self.revert()
    }

    fn revert(&mut self) -> StoreResult<()> {
        self.pending.clear();
        while let Some(undo) = self.undo.pop() {
            if let Err(e) = self.store.apply(&undo) {
                // Put it back so a later attempt (or Drop) can retry.
                self.undo.push(undo);
                return Err(e);
            }
            debug!(writes = undo.len(), "flush reverted");
        }
        Ok(())
    }
}

impl StateView for StateTx<'_> {
    fn read(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.get(key),
        }
    }

    fn scan(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan_prefix(prefix)?.into_iter().collect();
        for (key, value) in self.pending.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

impl Drop for StateTx<'_> {
    fn drop(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        if let Err(e) = self.revert() {
            error!(error = %e, "failed to revert flushed state");
        }
    }
}
