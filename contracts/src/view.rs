//! Read-only queries over committed bank state.
//!
//! Queries never consult the pause flag and never take the call lock, so
//! they stay available while the bank is paused and while a call is in
//! flight.

use serde::{Deserialize, Serialize};

use vaultbank_protocol::access::{self, Roles};
use vaultbank_protocol::authorization;
use vaultbank_protocol::ledger::{self, LedgerEntry};
use vaultbank_protocol::pause::{self, PauseState};
use vaultbank_protocol::storage::{LogicVersion, Snapshot, Store};
use vaultbank_protocol::vault::Custody;
use vaultbank_protocol::{Address, AssetId, BankError, BankResult};

use crate::meta;

/// Ledger total against what custody actually holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solvency {
    pub asset: AssetId,
    pub ledger_total: u128,
    pub custody: u64,
    pub solvent: bool,
}

#[derive(Clone, Copy)]
pub struct BankView<'a> {
    snapshot: Snapshot<'a>,
    custody: &'a Custody,
}

impl<'a> BankView<'a> {
    pub fn new(store: &'a dyn Store, custody: &'a Custody) -> Self {
        Self {
            snapshot: Snapshot::new(store),
            custody,
        }
    }

    pub fn balance_of(&self, account: &Address, asset: &AssetId) -> BankResult<u64> {
        Ok(ledger::balance_of(&self.snapshot, account, asset)?)
    }

    pub fn entries(&self) -> BankResult<Vec<LedgerEntry>> {
        Ok(ledger::entries(&self.snapshot)?)
    }

    pub fn roles(&self) -> BankResult<Roles> {
        access::load_roles(&self.snapshot)?.ok_or(BankError::NotInitialized)
    }

    pub fn owner(&self) -> BankResult<Address> {
        Ok(self.roles()?.owner)
    }

    pub fn admin(&self) -> BankResult<Address> {
        Ok(self.roles()?.admin)
    }

    pub fn pause_state(&self) -> BankResult<PauseState> {
        Ok(pause::load(&self.snapshot)?)
    }

    pub fn is_paused(&self) -> BankResult<bool> {
        Ok(self.pause_state()?.is_paused())
    }

    pub fn logic_version(&self) -> BankResult<LogicVersion> {
        meta::logic_version(&self.snapshot)
    }

    pub fn bank_address(&self) -> BankResult<Address> {
        meta::bank_address(&self.snapshot)
    }

    /// Next nonce `account` must sign a transfer with.
    pub fn nonce_of(&self, account: &Address) -> BankResult<u64> {
        Ok(authorization::nonce_of(&self.snapshot, account)?)
    }

    /// Compares the ledger total for `asset` with the bank's holdings.
    pub fn solvency(&self, asset: &AssetId) -> BankResult<Solvency> {
        let ledger_total = ledger::total(&self.snapshot, asset)?;
        let bank = self.bank_address()?;
        let custody = self
            .custody
            .held_by(&bank, asset)
            .map_err(BankError::TransferFailed)?;
        Ok(Solvency {
            asset: *asset,
            ledger_total,
            custody,
            solvent: ledger_total <= custody as u128,
        })
    }
}
