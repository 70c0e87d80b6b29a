//! # Bank Errors
//!
//! [`BankError`] is what every bank entry point returns. Module errors
//! convert into it with `?`; [`BankError::kind`] collapses the nesting into
//! a stable tag for logs, metrics labels and API responses.

use thiserror::Error;

use crate::access::AccessError;
use crate::address::Address;
use crate::ledger::LedgerError;
use crate::pause::PauseError;
use crate::storage::{LayoutError, LogicVersion, StoreError};

#[derive(Debug, Error)]
pub enum BankError {
    /// Deposits, withdrawals and transfers must move a positive amount.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Pause(#[from] PauseError),

    /// A native send or token call did not go through.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// A mutating call arrived while another was still executing on the
    /// same thread.
    #[error("reentrant call rejected")]
    Reentrancy,

    #[error("`{operation}` is not available on logic {version}")]
    UnsupportedOperation {
        operation: &'static str,
        version: LogicVersion,
    },

    #[error("incompatible storage layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid nonce for {account}: expected {expected}, got {got}")]
    InvalidNonce {
        account: Address,
        expected: u64,
        got: u64,
    },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("storage already initialized")]
    AlreadyInitialized,

    #[error("storage not initialized")]
    NotInitialized,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl BankError {
    /// Stable tag naming the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            BankError::ZeroAmount => "ZeroAmount",
            BankError::Ledger(LedgerError::InsufficientBalance { .. }) => "InsufficientBalance",
            BankError::Ledger(LedgerError::Overflow { .. }) => "Overflow",
            BankError::Ledger(LedgerError::Storage(_)) => "Storage",
            BankError::Access(AccessError::ZeroAddress(_)) => "InvalidAddress",
            BankError::Access(_) => "Unauthorized",
            BankError::Pause(PauseError::SystemPaused) => "SystemPaused",
            BankError::Pause(PauseError::AlreadyPaused) => "AlreadyPaused",
            BankError::Pause(PauseError::AlreadyActive) => "AlreadyActive",
            BankError::TransferFailed(_) => "TransferFailed",
            BankError::Reentrancy => "Reentrancy",
            BankError::UnsupportedOperation { .. } => "UnsupportedOperation",
            BankError::Layout(_) => "IncompatibleLayout",
            BankError::InvalidAddress(_) => "InvalidAddress",
            BankError::InvalidNonce { .. } => "InvalidNonce",
            BankError::InvalidSignature => "InvalidSignature",
            BankError::AlreadyInitialized => "AlreadyInitialized",
            BankError::NotInitialized => "NotInitialized",
            BankError::Storage(_) => "Storage",
        }
    }

    pub fn is_storage(&self) -> bool {
        self.kind() == "Storage"
    }
}

pub type BankResult<T> = Result<T, BankError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::address::AssetId;

    #[test]
    fn nested_errors_collapse_to_kinds() {
        let insufficient: BankError = LedgerError::InsufficientBalance {
            account: Address::from_label("a"),
            asset: AssetId::Native,
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(insufficient.kind(), "InsufficientBalance");

        let denied: BankError = AccessError::Unauthorized {
            caller: Address::from_label("a"),
            required: Role::Admin,
        }
        .into();
        assert_eq!(denied.kind(), "Unauthorized");

        let zero: BankError = AccessError::ZeroAddress(Role::Admin).into();
        assert_eq!(zero.kind(), "InvalidAddress");

        let paused: BankError = PauseError::SystemPaused.into();
        assert_eq!(paused.kind(), "SystemPaused");

        let layout: BankError = LayoutError::NotAnExtension { current: 2, target: 1 }.into();
        assert_eq!(layout.kind(), "IncompatibleLayout");
    }

    #[test]
    fn messages_are_readable() {
        let err = BankError::UnsupportedOperation {
            operation: "transfer_native",
            version: LogicVersion::V1,
        };
        assert_eq!(err.to_string(), "`transfer_native` is not available on logic v1");
        assert!(!err.is_storage());
    }
}
