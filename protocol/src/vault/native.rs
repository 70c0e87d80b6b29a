//! # Native Coin Transport
//!
//! Platform-level balances of the native coin, outside the bank's ledger.
//! The bank's custody of native coin is simply its own balance here.
//!
//! A recipient may register a [`ReceiveHook`]. The hook runs before the coin
//! moves and may reject the payment, which fails the send. Hooks are also
//! how tests model a contract recipient that calls back into the bank while
//! a withdrawal is in flight.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::address::Address;
use crate::config::PREFIX_COIN_BALANCE;
use crate::storage::{decode, encode, Store, StoreError, WriteBatch};

#[derive(Debug, Error)]
pub enum NativeError {
    #[error("insufficient funds: {holder} has {available}, tried to send {requested}")]
    InsufficientFunds {
        holder: Address,
        available: u64,
        requested: u64,
    },

    #[error("balance overflow crediting {recipient}")]
    Overflow { recipient: Address },

    /// The recipient's receive hook refused the payment.
    #[error("payment rejected by {recipient}: {reason}")]
    Rejected { recipient: Address, reason: String },

    #[error("cannot send to the zero address")]
    ZeroAddress,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Code that runs when a recipient is paid.
pub trait ReceiveHook: Send + Sync {
    /// Returning `Err` rejects the payment.
    fn on_receive(&self, from: Address, amount: u64) -> Result<(), String>;
}

/// Store-backed native coin balances.
pub struct NativeCoin {
    store: Arc<dyn Store>,
    hooks: DashMap<Address, Arc<dyn ReceiveHook>>,
    write_lock: Mutex<()>,
}

fn balance_key(holder: &Address) -> Vec<u8> {
    let mut key = PREFIX_COIN_BALANCE.to_vec();
    key.extend_from_slice(holder.as_bytes());
    key
}

impl NativeCoin {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            hooks: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn balance_of(&self, holder: &Address) -> Result<u64, NativeError> {
        match self.store.get(&balance_key(holder))? {
            Some(bytes) => Ok(decode(&bytes)?),
            None => Ok(0),
        }
    }

    /// Creates coin out of thin air. Genesis allocations and the devnet
    /// faucet only; the bank never calls this.
    pub fn mint(&self, to: &Address, amount: u64) -> Result<u64, NativeError> {
        if to.is_zero() {
            return Err(NativeError::ZeroAddress);
        }
        let _guard = self.write_lock.lock();
        let balance = self
            .balance_of(to)?
            .checked_add(amount)
            .ok_or(NativeError::Overflow { recipient: *to })?;
        let mut batch = WriteBatch::new();
        batch.put(balance_key(to), encode(&balance)?);
        self.store.apply(&batch)?;
        Ok(balance)
    }

    pub fn set_receive_hook(&self, holder: Address, hook: Arc<dyn ReceiveHook>) {
        self.hooks.insert(holder, hook);
    }

    pub fn clear_receive_hook(&self, holder: &Address) {
        self.hooks.remove(holder);
    }

    /// Sends `amount` from `from` to `to`.
    ///
    /// The recipient's hook, if any, runs first and without any lock held,
    /// so it may call back into the coin or the bank.
    pub fn send(&self, from: &Address, to: &Address, amount: u64) -> Result<(), NativeError> {
        if to.is_zero() {
            return Err(NativeError::ZeroAddress);
        }
        let available = self.balance_of(from)?;
        if available < amount {
            return Err(NativeError::InsufficientFunds {
                holder: *from,
                available,
                requested: amount,
            });
        }

        // Clone out of the map so no shard lock is held during the call.
        let hook = self.hooks.get(to).map(|h| Arc::clone(h.value()));
        if let Some(hook) = hook {
            hook.on_receive(*from, amount)
                .map_err(|reason| NativeError::Rejected {
                    recipient: *to,
                    reason,
                })?;
        }

        let _guard = self.write_lock.lock();
        let from_balance = self.balance_of(from)?;
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(NativeError::InsufficientFunds {
                holder: *from,
                available: from_balance,
                requested: amount,
            })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)?
            .checked_add(amount)
            .ok_or(NativeError::Overflow { recipient: *to })?;

        let mut batch = WriteBatch::new();
        if remaining == 0 {
            batch.delete(balance_key(from));
        } else {
            batch.put(balance_key(from), encode(&remaining)?);
        }
        batch.put(balance_key(to), encode(&credited)?);
        self.store.apply(&batch)?;
        debug!(from = %from, to = %to, amount, "native coin sent");
        Ok(())
    }
}

impl std::fmt::Debug for NativeCoin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeCoin")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
