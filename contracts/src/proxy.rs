//! # Bank Proxy
//!
//! The stable face of a bank deployment. The proxy owns the storage handle
//! and custody, and forwards each entry point to the active logic revision.
//! Upgrading swaps the revision; storage, address and custody stay put.
//!
//! ## Dispatch
//!
//! There is no dynamic dispatch. The active [`LogicVersion`] is read from
//! storage at the start of every call and matched:
//!
//! ```text
//! entry point ─► Call (overlay) ─► verified version ─┬─ V1 ─► bank_v1
//!                                                    └─ V2 ─► bank_v1 | bank_v2
//! ```
//!
//! Entry points a version does not provide fail `UnsupportedOperation`.
//!
//! ## Atomicity
//!
//! Each call runs in its own [`Call`]. On success the overlay commits and a
//! [`Receipt`] comes back. On any error the overlay is discarded and every
//! flush the call made is reverted, so ledger, roles and pause flag are
//! exactly as they were before the call.
//!
//! ## Upgrades
//!
//! [`BankProxy::upgrade_to`] is owner-gated and works while paused. The
//! target layout must extend the current one, and the stored layout
//! fingerprint must match the current version. Only the version and
//! fingerprint metadata are rewritten.

use std::sync::Arc;
use tracing::{error, info, warn};

use vaultbank_protocol::access::{self, Role, Roles};
use vaultbank_protocol::authorization::TransferAuthorization;
use vaultbank_protocol::config::BankConfig;
use vaultbank_protocol::pause::{self, PauseState};
use vaultbank_protocol::storage::{LogicVersion, Snapshot, StateTx, Store};
use vaultbank_protocol::vault::Custody;
use vaultbank_protocol::{Address, BankError, BankEvent, BankResult, Receipt};

use crate::call::Call;
use crate::view::BankView;
use crate::{bank_v1, bank_v2, meta};

/// Parameters for a fresh deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    /// Address the proxy holds custody under.
    pub address: Address,
    /// The deployer. Becomes owner.
    pub owner: Address,
    pub admin: Address,
}

/// A bank deployment: storage, custody, and the entry points.
pub struct BankProxy {
    store: Arc<dyn Store>,
    custody: Custody,
    config: BankConfig,
    address: Address,
}

impl BankProxy {
    /// Initializes empty storage at logic V1 with an empty ledger and the
    /// pause flag Active.
    pub fn deploy(
        store: Arc<dyn Store>,
        custody: Custody,
        config: BankConfig,
        deployment: Deployment,
    ) -> BankResult<(Self, Receipt)> {
        if deployment.address.is_zero() {
            return Err(BankError::InvalidAddress(
                "bank address cannot be zero".into(),
            ));
        }
        if meta::is_initialized(&Snapshot::new(store.as_ref()))? {
            return Err(BankError::AlreadyInitialized);
        }
        let roles = Roles::new(deployment.owner, deployment.admin)?;
        let version = LogicVersion::V1;

        let mut tx = StateTx::new(store.as_ref());
        meta::store_bank_address(&mut tx, &deployment.address)?;
        meta::store_version(&mut tx, version)?;
        access::store_roles(&mut tx, &roles)?;
        pause::store(&mut tx, PauseState::Active)?;
        tx.commit()?;

        let receipt = Receipt::new(
            "initialize",
            deployment.owner,
            vec![BankEvent::Initialized {
                owner: roles.owner,
                admin: roles.admin,
                version,
            }],
        );
        info!(
            bank = %deployment.address,
            owner = %roles.owner,
            admin = %roles.admin,
            %version,
            "bank deployed"
        );

        let proxy = Self {
            store,
            custody,
            config,
            address: deployment.address,
        };
        Ok((proxy, receipt))
    }

    /// Opens an existing deployment. Fails `NotInitialized` on empty
    /// storage and `IncompatibleLayout` if the stored layout fingerprint
    /// does not match the stored version.
    pub fn attach(store: Arc<dyn Store>, custody: Custody, config: BankConfig) -> BankResult<Self> {
        let snapshot = Snapshot::new(store.as_ref());
        let address = meta::bank_address(&snapshot)?;
        let version = meta::verified_version(&snapshot)?;
        info!(bank = %address, %version, "attached to bank storage");
        Ok(Self {
            store,
            custody,
            config,
            address,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn custody(&self) -> &Custody {
        &self.custody
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    /// Read-only queries.
    pub fn view(&self) -> BankView<'_> {
        BankView::new(self.store.as_ref(), &self.custody)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    fn execute<F>(&self, operation: &'static str, caller: Address, body: F) -> BankResult<Receipt>
    where
        F: FnOnce(&mut Call<'_>, LogicVersion) -> BankResult<()>,
    {
        let mut call = Call::new(
            operation,
            caller,
            self.address,
            self.store.as_ref(),
            &self.custody,
            &self.config,
        );
        let outcome = call
            .logic_version()
            .and_then(|version| body(&mut call, version));

        match outcome {
            Ok(()) => {
                let events = call.commit()?;
                for event in &events {
                    log_event(operation, &caller, event);
                }
                Ok(Receipt::new(operation, caller, events))
            }
            Err(e) => {
                if let Err(revert) = call.rollback() {
                    error!(operation, error = %revert, "rollback failed");
                }
                warn!(operation, caller = %caller, kind = e.kind(), error = %e, "operation rejected");
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Deposit / withdraw (all versions)
    // -----------------------------------------------------------------------

    pub fn deposit_native(&mut self, caller: Address, value: u64) -> BankResult<Receipt> {
        self.execute("deposit_native", caller, |call, version| match version {
            LogicVersion::V1 | LogicVersion::V2 => bank_v1::deposit_native(call, value),
        })
    }

    pub fn deposit_token(&mut self, caller: Address, token: Address, amount: u64) -> BankResult<Receipt> {
        self.execute("deposit_token", caller, |call, version| match version {
            LogicVersion::V1 | LogicVersion::V2 => bank_v1::deposit_token(call, token, amount),
        })
    }

    pub fn withdraw_native(&mut self, caller: Address, amount: u64) -> BankResult<Receipt> {
        self.execute("withdraw_native", caller, |call, version| match version {
            LogicVersion::V1 | LogicVersion::V2 => bank_v1::withdraw_native(call, amount),
        })
    }

    pub fn withdraw_token(&mut self, caller: Address, token: Address, amount: u64) -> BankResult<Receipt> {
        self.execute("withdraw_token", caller, |call, version| match version {
            LogicVersion::V1 | LogicVersion::V2 => bank_v1::withdraw_token(call, token, amount),
        })
    }

    // -----------------------------------------------------------------------
    // Transfers (V2)
    // -----------------------------------------------------------------------

    pub fn transfer_native(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u64,
    ) -> BankResult<Receipt> {
        self.execute("transfer_native", caller, |call, version| match version {
            LogicVersion::V1 => Err(call.unsupported(version)),
            LogicVersion::V2 => bank_v2::transfer_native(call, from, to, amount),
        })
    }

    pub fn transfer_token(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        token: Address,
        amount: u64,
    ) -> BankResult<Receipt> {
        self.execute("transfer_token", caller, |call, version| match version {
            LogicVersion::V1 => Err(call.unsupported(version)),
            LogicVersion::V2 => bank_v2::transfer_token(call, from, to, token, amount),
        })
    }

    pub fn transfer_native_external(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u64,
    ) -> BankResult<Receipt> {
        self.execute("transfer_native_external", caller, |call, version| match version {
            LogicVersion::V1 => Err(call.unsupported(version)),
            LogicVersion::V2 => bank_v2::transfer_native_external(call, from, to, amount),
        })
    }

    pub fn transfer_token_external(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        token: Address,
        amount: u64,
    ) -> BankResult<Receipt> {
        self.execute("transfer_token_external", caller, |call, version| match version {
            LogicVersion::V1 => Err(call.unsupported(version)),
            LogicVersion::V2 => bank_v2::transfer_token_external(call, from, to, token, amount),
        })
    }

    /// Relays a transfer signed by the `from` account. `caller` is the relayer.
    pub fn transfer_signed(
        &mut self,
        caller: Address,
        authorization: &TransferAuthorization,
    ) -> BankResult<Receipt> {
        self.execute("transfer_signed", caller, |call, version| match version {
            LogicVersion::V1 => Err(call.unsupported(version)),
            LogicVersion::V2 => bank_v2::transfer_signed(call, authorization),
        })
    }

    // -----------------------------------------------------------------------
    // Administration (all versions)
    // -----------------------------------------------------------------------

    pub fn pause(&mut self, caller: Address) -> BankResult<Receipt> {
        self.execute("pause", caller, |call, _| bank_v1::pause(call))
    }

    pub fn unpause(&mut self, caller: Address) -> BankResult<Receipt> {
        self.execute("unpause", caller, |call, _| bank_v1::unpause(call))
    }

    pub fn update_admin(&mut self, caller: Address, new_admin: Address) -> BankResult<Receipt> {
        self.execute("update_admin", caller, |call, _| {
            bank_v1::update_admin(call, new_admin)
        })
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> BankResult<Receipt> {
        self.execute("transfer_ownership", caller, |call, _| {
            bank_v1::transfer_ownership(call, new_owner)
        })
    }

    /// Switches the active logic to `target`.
    pub fn upgrade_to(&mut self, caller: Address, target: LogicVersion) -> BankResult<Receipt> {
        self.execute("upgrade_to", caller, |call, current| {
            call.require(Role::Owner)?;
            target.layout().extends(current.layout())?;
            meta::store_version(&mut call.state, target)?;
            call.emit(BankEvent::Upgraded {
                from: current,
                to: target,
            });
            Ok(())
        })
    }
}

fn log_event(operation: &'static str, caller: &Address, event: &BankEvent) {
    match event {
        BankEvent::Deposit {
            account,
            asset,
            amount,
        }
        | BankEvent::Withdraw {
            account,
            asset,
            amount,
        } => info!(
            operation,
            caller = %caller,
            account = %account,
            %asset,
            amount,
            event = event.name(),
            "ledger updated"
        ),
        BankEvent::LedgerTransfer {
            from,
            to,
            asset,
            amount,
            external,
        } => info!(
            operation,
            caller = %caller,
            from = %from,
            to = %to,
            %asset,
            amount,
            external,
            "ledger transfer"
        ),
        BankEvent::Upgraded { from, to } => info!(
            operation,
            caller = %caller,
            from = %from,
            to = %to,
            "logic upgraded"
        ),
        other => info!(operation, caller = %caller, event = other.name(), "bank state changed"),
    }
}
