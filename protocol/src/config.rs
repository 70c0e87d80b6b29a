//! # Protocol Configuration & Constants
//!
//! Every magic number in VaultBank lives here, next to the runtime
//! [`BankConfig`] that the node builds from its command line.
//!
//! The storage key prefixes below are part of the persisted layout. Changing
//! one after data has been written orphans that data, so the layout module
//! refuses to load a layout whose fingerprint does not match what is on disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Length of an [`Address`](crate::address::Address) in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Crate version, reported by the node.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Storage key prefixes
// ---------------------------------------------------------------------------

/// Proxy metadata: own address, active logic version, layout fingerprint.
pub const PREFIX_META: &[u8] = b"meta/";

/// Owner and admin role records.
pub const PREFIX_ROLES: &[u8] = b"roles/";

/// The pause flag.
pub const PREFIX_PAUSE: &[u8] = b"pause/";

/// Ledger entries, keyed by `account || asset`.
pub const PREFIX_LEDGER: &[u8] = b"ledger/";

/// Per-account transfer nonces (second revision onward).
pub const PREFIX_TRANSFER_NONCES: &[u8] = b"nonces/";

/// Token contract storage: balances keyed by holder.
pub const PREFIX_TOKEN_BALANCE: &[u8] = b"balance/";

/// Token contract storage: allowances keyed by `owner || spender`.
pub const PREFIX_TOKEN_ALLOWANCE: &[u8] = b"allowance/";

/// Token contract storage: metadata record.
pub const PREFIX_TOKEN_INFO: &[u8] = b"info/";

/// Native coin storage: platform balances keyed by holder.
pub const PREFIX_COIN_BALANCE: &[u8] = b"coin/";

// ---------------------------------------------------------------------------
// Signed transfers
// ---------------------------------------------------------------------------

/// Domain tag mixed into every signed transfer message. A signature made for
/// one bank deployment never verifies against another, because the bank's
/// address is part of the message too.
pub const TRANSFER_SIGNING_DOMAIN: &str = "vaultbank transfer authorization v1";

/// Context string for storage layout fingerprints.
pub const LAYOUT_FINGERPRINT_DOMAIN: &str = "vaultbank storage layout v1";

// ---------------------------------------------------------------------------
// Node defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Label the node uses to derive the bank's own address on `init`.
pub const BANK_ADDRESS_LABEL: &str = "vaultbank/proxy";

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Which entry points keep working while the bank is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PausePolicy {
    /// Every deposit, withdrawal and transfer is blocked.
    #[default]
    Strict,
    /// Withdrawals stay open so depositors can always exit; everything
    /// else is blocked.
    AllowWithdrawals,
}

impl fmt::Display for PausePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PausePolicy::Strict => write!(f, "strict"),
            PausePolicy::AllowWithdrawals => write!(f, "allow_withdrawals"),
        }
    }
}

impl FromStr for PausePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(PausePolicy::Strict),
            "allow_withdrawals" => Ok(PausePolicy::AllowWithdrawals),
            other => Err(format!("unknown pause policy: {}", other)),
        }
    }
}

/// Runtime settings for a bank deployment. Not persisted: every process
/// attaching to the storage supplies its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConfig {
    /// Which operations are exempt from the pause switch.
    #[serde(default)]
    pub pause_policy: PausePolicy,
}

impl BankConfig {
    pub fn with_pause_policy(mut self, pause_policy: PausePolicy) -> Self {
        self.pause_policy = pause_policy;
        self
    }
}
