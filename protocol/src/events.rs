//! # Bank Events
//!
//! Every successful entry point emits one or more [`BankEvent`]s and returns
//! them in a [`Receipt`]. Events are the audit trail: replaying every
//! `Deposit`, `Withdraw` and `LedgerTransfer` from an empty ledger reproduces
//! the ledger exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::{Address, AssetId};
use crate::storage::LogicVersion;

/// A state change the bank committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BankEvent {
    /// Storage initialized behind a fresh proxy.
    Initialized {
        owner: Address,
        admin: Address,
        version: LogicVersion,
    },

    /// Value entered custody and was credited to `account`.
    Deposit {
        account: Address,
        asset: AssetId,
        amount: u64,
    },

    /// `account` was debited and the value left custody to it.
    Withdraw {
        account: Address,
        asset: AssetId,
        amount: u64,
    },

    /// `from` was debited. When `external` is false `to` was credited in the
    /// ledger; otherwise the value left custody to `to`.
    LedgerTransfer {
        from: Address,
        to: Address,
        asset: AssetId,
        amount: u64,
        external: bool,
    },

    Paused {
        by: Address,
    },

    Unpaused {
        by: Address,
    },

    AdminChanged {
        previous: Address,
        admin: Address,
    },

    OwnershipTransferred {
        previous: Address,
        owner: Address,
    },

    Upgraded {
        from: LogicVersion,
        to: LogicVersion,
    },
}

impl BankEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BankEvent::Initialized { .. } => "Initialized",
            BankEvent::Deposit { .. } => "Deposit",
            BankEvent::Withdraw { .. } => "Withdraw",
            BankEvent::LedgerTransfer { .. } => "LedgerTransfer",
            BankEvent::Paused { .. } => "Paused",
            BankEvent::Unpaused { .. } => "Unpaused",
            BankEvent::AdminChanged { .. } => "AdminChanged",
            BankEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            BankEvent::Upgraded { .. } => "Upgraded",
        }
    }
}

/// Proof that an entry point committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub operation: String,
    pub caller: Address,
    pub events: Vec<BankEvent>,
    pub timestamp: DateTime<Utc>,
}

impl Receipt {
    pub fn new(operation: &str, caller: Address, events: Vec<BankEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation: operation.to_string(),
            caller,
            events,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = BankEvent::Deposit {
            account: Address::from_label("alice"),
            asset: AssetId::Native,
            amount: 100,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "deposit");
        assert_eq!(json["asset"], "native");
        assert_eq!(json["amount"], 100);
        assert_eq!(event.name(), "Deposit");
    }

    #[test]
    fn receipts_get_unique_ids() {
        let caller = Address::from_label("alice");
        let a = Receipt::new("pause", caller, vec![BankEvent::Paused { by: caller }]);
        let b = Receipt::new("pause", caller, vec![]);
        assert_ne!(a.id, b.id);
        assert_eq!(a.operation, "pause");
    }
}
