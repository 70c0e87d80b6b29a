//! # Balance Ledger
//!
//! The authoritative `(account, asset) → amount` mapping. Entries live under
//! the `ledger/` slot; an absent entry is zero and a zero entry is deleted,
//! so the slot only ever holds positive balances.
//!
//! The primitives here are internal to the engines. They stage writes in the
//! caller's [`StateTx`] and never touch custody. All arithmetic is checked:
//!
//! - [`credit`] fails with [`LedgerError::Overflow`] past `u64::MAX`.
//! - [`debit`] fails with [`LedgerError::InsufficientBalance`] instead of
//!   going negative.
//! - [`move_balance`] is debit then credit in the same overlay, so both land
//!   or neither does.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{Address, AssetId};
use crate::config::PREFIX_LEDGER;
use crate::storage::keys;
use crate::storage::{decode, StateTx, StateView, StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance: {account} holds {available} of {asset}, requested {requested}")]
    InsufficientBalance {
        account: Address,
        asset: AssetId,
        available: u64,
        requested: u64,
    },

    #[error("balance overflow: {account} holds {current} of {asset}, crediting {amount}")]
    Overflow {
        account: Address,
        asset: AssetId,
        current: u64,
        amount: u64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One non-zero ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account: Address,
    pub asset: AssetId,
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// The entry for `(account, asset)`, or zero.
pub fn balance_of(view: &impl StateView, account: &Address, asset: &AssetId) -> StoreResult<u64> {
    Ok(view
        .load::<u64>(&keys::ledger_entry(account, asset))?
        .unwrap_or(0))
}

/// Every non-zero entry, ordered by account then asset.
pub fn entries(view: &impl StateView) -> StoreResult<Vec<LedgerEntry>> {
    let mut out = Vec::new();
    for (key, value) in view.scan(PREFIX_LEDGER)? {
        let Some((account, asset)) = keys::parse_ledger_entry(&key) else {
            continue;
        };
        let amount: u64 = decode(&value)?;
        out.push(LedgerEntry {
            account,
            asset,
            amount,
        });
    }
    Ok(out)
}

/// Sum of every entry for `asset`. Widened to `u128` because the sum over
/// many accounts can exceed any single balance.
pub fn total(view: &impl StateView, asset: &AssetId) -> StoreResult<u128> {
    Ok(entries(view)?
        .into_iter()
        .filter(|e| e.asset == *asset)
        .map(|e| e.amount as u128)
        .sum())
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

fn write_entry(tx: &mut StateTx<'_>, account: &Address, asset: &AssetId, amount: u64) -> StoreResult<()> {
    let key = keys::ledger_entry(account, asset);
    if amount == 0 {
        tx.delete(key);
        Ok(())
    } else {
        tx.save(key, &amount)
    }
}

/// Adds `amount` to the entry. Returns the new balance.
pub fn credit(
    tx: &mut StateTx<'_>,
    account: &Address,
    asset: &AssetId,
    amount: u64,
) -> Result<u64, LedgerError> {
    let current = balance_of(&*tx, account, asset)?;
    let updated = current
        .checked_add(amount)
        .ok_or(LedgerError::Overflow {
            account: *account,
            asset: *asset,
            current,
            amount,
        })?;
    write_entry(tx, account, asset, updated)?;
    Ok(updated)
}

/// Subtracts `amount` from the entry. Returns the new balance.
pub fn debit(
    tx: &mut StateTx<'_>,
    account: &Address,
    asset: &AssetId,
    amount: u64,
) -> Result<u64, LedgerError> {
    let current = balance_of(&*tx, account, asset)?;
    let updated = current
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientBalance {
            account: *account,
            asset: *asset,
            available: current,
            requested: amount,
        })?;
    write_entry(tx, account, asset, updated)?;
    Ok(updated)
}

/// Debits `from` and credits `to` in one overlay.
pub fn move_balance(
    tx: &mut StateTx<'_>,
    from: &Address,
    to: &Address,
    asset: &AssetId,
    amount: u64,
) -> Result<(), LedgerError> {
    debit(tx, from, asset, amount)?;
    credit(tx, to, asset, amount)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Snapshot};

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn token() -> AssetId {
        AssetId::Token(Address::from_label("usd"))
    }

    #[test]
    fn absent_entry_is_zero() {
        let store = MemoryStore::new();
        let view = Snapshot::new(&store);
        assert_eq!(balance_of(&view, &alice(), &AssetId::Native).unwrap(), 0);
        assert!(entries(&view).unwrap().is_empty());
    }

    #[test]
    fn credit_then_debit_to_zero_deletes_entry() {
        let store = MemoryStore::new();
        let mut tx = StateTx::new(&store);
        assert_eq!(credit(&mut tx, &alice(), &AssetId::Native, 100).unwrap(), 100);
        assert_eq!(debit(&mut tx, &alice(), &AssetId::Native, 100).unwrap(), 0);
        tx.commit().unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn debit_past_balance_fails_unchanged() {
        let store = MemoryStore::new();
        let mut tx = StateTx::new(&store);
        credit(&mut tx, &alice(), &token(), 50).unwrap();

        let err = debit(&mut tx, &alice(), &token(), 51).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                available: 50,
                requested: 51,
                ..
            }
        ));
        assert_eq!(balance_of(&tx, &alice(), &token()).unwrap(), 50);
    }

    #[test]
    fn credit_overflow_fails_unchanged() {
        let store = MemoryStore::new();
        let mut tx = StateTx::new(&store);
        credit(&mut tx, &alice(), &AssetId::Native, u64::MAX).unwrap();

        let err = credit(&mut tx, &alice(), &AssetId::Native, 1).unwrap_err();
        assert!(matches!(err, LedgerError::Overflow { current: u64::MAX, amount: 1, .. }));
        assert_eq!(balance_of(&tx, &alice(), &AssetId::Native).unwrap(), u64::MAX);
    }

    #[test]
    fn move_balance_conserves_total() {
        let store = MemoryStore::new();
        let mut tx = StateTx::new(&store);
        credit(&mut tx, &alice(), &AssetId::Native, 100).unwrap();
        move_balance(&mut tx, &alice(), &bob(), &AssetId::Native, 40).unwrap();

        assert_eq!(balance_of(&tx, &alice(), &AssetId::Native).unwrap(), 60);
        assert_eq!(balance_of(&tx, &bob(), &AssetId::Native).unwrap(), 40);
        assert_eq!(total(&tx, &AssetId::Native).unwrap(), 100);
    }

    #[test]
    fn move_to_self_is_a_noop() {
        let store = MemoryStore::new();
        let mut tx = StateTx::new(&store);
        credit(&mut tx, &alice(), &AssetId::Native, 10).unwrap();
        move_balance(&mut tx, &alice(), &alice(), &AssetId::Native, 10).unwrap();
        assert_eq!(balance_of(&tx, &alice(), &AssetId::Native).unwrap(), 10);
    }

    #[test]
    fn totals_are_per_asset() {
        let store = MemoryStore::new();
        let mut tx = StateTx::new(&store);
        credit(&mut tx, &alice(), &AssetId::Native, u64::MAX).unwrap();
        credit(&mut tx, &bob(), &AssetId::Native, u64::MAX).unwrap();
        credit(&mut tx, &bob(), &token(), 7).unwrap();
        tx.commit().unwrap();

        let view = Snapshot::new(&store);
        assert_eq!(total(&view, &AssetId::Native).unwrap(), 2 * u64::MAX as u128);
        assert_eq!(total(&view, &token()).unwrap(), 7);
        assert_eq!(entries(&view).unwrap().len(), 3);
    }
}
