//! # Call Context
//!
//! One [`Call`] per entry-point invocation. It carries who is calling, the
//! write overlay the call stages into, handles to custody, and the events
//! emitted so far. Engines receive `&mut Call` and nothing else.

use vaultbank_protocol::access::{self, Role, Roles};
use vaultbank_protocol::config::BankConfig;
use vaultbank_protocol::pause::{self, Gate};
use vaultbank_protocol::storage::{LogicVersion, StateTx, Store};
use vaultbank_protocol::vault::Custody;
use vaultbank_protocol::{Address, AssetId, BankError, BankEvent, BankResult};

use crate::meta;

pub struct Call<'a> {
    operation: &'static str,
    caller: Address,
    bank: Address,
    custody: &'a Custody,
    config: &'a BankConfig,
    events: Vec<BankEvent>,
    /// Staged writes for this call.
    pub state: StateTx<'a>,
}

impl<'a> Call<'a> {
    pub fn new(
        operation: &'static str,
        caller: Address,
        bank: Address,
        store: &'a dyn Store,
        custody: &'a Custody,
        config: &'a BankConfig,
    ) -> Self {
        Self {
            operation,
            caller,
            bank,
            custody,
            config,
            events: Vec::new(),
            state: StateTx::new(store),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    /// The proxy's own address: the holder of custody.
    pub fn bank(&self) -> Address {
        self.bank
    }

    pub fn emit(&mut self, event: BankEvent) {
        self.events.push(event);
    }

    // -- checks ---------------------------------------------------------------

    pub fn roles(&self) -> BankResult<Roles> {
        access::load_roles(&self.state)?.ok_or(BankError::NotInitialized)
    }

    /// Fails with `Unauthorized` unless the caller holds `role`.
    pub fn require(&self, role: Role) -> BankResult<Roles> {
        let roles = self.roles()?;
        roles.authorize(&self.caller, role)?;
        Ok(roles)
    }

    /// Fails with `SystemPaused` when the pause flag blocks `gate`.
    pub fn ensure_open(&self, gate: Gate) -> BankResult<()> {
        let state = pause::load(&self.state)?;
        state.ensure_open(gate, self.config.pause_policy)?;
        Ok(())
    }

    pub fn logic_version(&self) -> BankResult<LogicVersion> {
        meta::verified_version(&self.state)
    }

    /// The error for an entry point the active logic does not provide.
    pub fn unsupported(&self, version: LogicVersion) -> BankError {
        BankError::UnsupportedOperation {
            operation: self.operation,
            version,
        }
    }

    /// Maps a token address argument onto an asset id. The zero address is
    /// the native sentinel, never a token.
    pub fn token_asset(token: &Address) -> BankResult<AssetId> {
        if token.is_zero() {
            return Err(BankError::InvalidAddress(
                "the zero address is the native coin, not a token".into(),
            ));
        }
        Ok(AssetId::Token(*token))
    }

    /// Fails with `InvalidAddress` when `account` is the bank itself. Custody
    /// cannot pay or be paid by its own holder.
    pub fn ensure_not_bank(&self, account: &Address) -> BankResult<()> {
        if *account == self.bank {
            return Err(BankError::InvalidAddress(
                "the bank cannot be a party to its own ledger".into(),
            ));
        }
        Ok(())
    }

    // -- value movement -------------------------------------------------------

    /// Takes `amount` of `asset` from `from` into custody.
    pub fn pull(&self, asset: &AssetId, from: &Address, amount: u64) -> BankResult<()> {
        match asset {
            AssetId::Native => self
                .custody
                .native
                .send(from, &self.bank, amount)
                .map_err(|e| BankError::TransferFailed(e.to_string())),
            AssetId::Token(token) => {
                let token = self
                    .custody
                    .tokens
                    .resolve(token)
                    .map_err(|e| BankError::TransferFailed(e.to_string()))?;
                token
                    .transfer_from(self.bank, *from, self.bank, amount)
                    .map_err(|e| BankError::TransferFailed(e.to_string()))
            }
        }
    }

    /// Sends `amount` of `asset` out of custody to `to`.
    pub fn send(&self, asset: &AssetId, to: &Address, amount: u64) -> BankResult<()> {
        match asset {
            AssetId::Native => self
                .custody
                .native
                .send(&self.bank, to, amount)
                .map_err(|e| BankError::TransferFailed(e.to_string())),
            AssetId::Token(token) => {
                let token = self
                    .custody
                    .tokens
                    .resolve(token)
                    .map_err(|e| BankError::TransferFailed(e.to_string()))?;
                token
                    .transfer(self.bank, *to, amount)
                    .map_err(|e| BankError::TransferFailed(e.to_string()))
            }
        }
    }

    // -- completion -----------------------------------------------------------

    /// Commits staged state and hands back the emitted events.
    pub fn commit(self) -> BankResult<Vec<BankEvent>> {
        self.state.commit()?;
        Ok(self.events)
    }

    /// Discards staged state and reverts anything already flushed.
    pub fn rollback(self) -> BankResult<()> {
        self.state.rollback()?;
        Ok(())
    }
}
