//! # Storage Layouts
//!
//! A logic revision does not own storage; it declares the slots it expects.
//! A [`StorageLayout`] is that declaration: an ordered list of named slots,
//! each a key prefix. Upgrading from one revision to another is only sound
//! when the new layout *extends* the old one:
//!
//! ```text
//! V1: meta/ roles/ pause/ ledger/
//! V2: meta/ roles/ pause/ ledger/ nonces/
//!     └──────── unchanged ───────┘ └ new ┘
//! ```
//!
//! Every slot the old revision wrote is still at the same prefix with the
//! same meaning, so the new revision reads it without migration. New slots
//! only ever append.
//!
//! The proxy persists a BLAKE3 fingerprint of the active layout next to the
//! logic version. On upgrade and on attach the stored fingerprint must match
//! the layout the stored version claims, which catches both tampering and a
//! binary whose layout table has drifted from the data on disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{
    LAYOUT_FINGERPRINT_DOMAIN, PREFIX_LEDGER, PREFIX_META, PREFIX_PAUSE, PREFIX_ROLES,
    PREFIX_TRANSFER_NONCES,
};
use crate::crypto::hash::domain_separated_hash;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// Two slots share a prefix relationship, so their keys could collide.
    #[error("slots `{first}` and `{second}` have overlapping key prefixes")]
    PrefixCollision {
        first: &'static str,
        second: &'static str,
    },

    /// A slot the older layout declares is missing or moved in the newer one.
    #[error("slot {index} changed: expected `{expected}`, found `{found}`")]
    SlotMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// The newer layout adds nothing. Covers same-version and downgrades.
    #[error("layout v{target} does not extend v{current}")]
    NotAnExtension { current: u32, target: u32 },

    /// The persisted fingerprint is not the one this layout produces.
    #[error("stored layout fingerprint does not match layout v{version}")]
    FingerprintMismatch { version: u32 },

    /// Stored logic version is not one this build knows.
    #[error("unknown logic version {0}")]
    UnknownVersion(u32),
}

// ---------------------------------------------------------------------------
// Slots & layouts
// ---------------------------------------------------------------------------

/// A named region of storage: every key under `prefix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub name: &'static str,
    pub prefix: &'static [u8],
}

pub const SLOT_META: Slot = Slot {
    name: "meta",
    prefix: PREFIX_META,
};
pub const SLOT_ROLES: Slot = Slot {
    name: "roles",
    prefix: PREFIX_ROLES,
};
pub const SLOT_PAUSE: Slot = Slot {
    name: "pause",
    prefix: PREFIX_PAUSE,
};
pub const SLOT_LEDGER: Slot = Slot {
    name: "ledger",
    prefix: PREFIX_LEDGER,
};
pub const SLOT_TRANSFER_NONCES: Slot = Slot {
    name: "transfer_nonces",
    prefix: PREFIX_TRANSFER_NONCES,
};

/// An ordered slot list declared by one logic revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageLayout {
    pub version: u32,
    pub slots: &'static [Slot],
}

/// Deposit/withdraw revision.
pub const LAYOUT_V1: StorageLayout = StorageLayout {
    version: 1,
    slots: &[SLOT_META, SLOT_ROLES, SLOT_PAUSE, SLOT_LEDGER],
};

/// Transfer revision: V1 plus replay-protection nonces.
pub const LAYOUT_V2: StorageLayout = StorageLayout {
    version: 2,
    slots: &[
        SLOT_META,
        SLOT_ROLES,
        SLOT_PAUSE,
        SLOT_LEDGER,
        SLOT_TRANSFER_NONCES,
    ],
};

impl StorageLayout {
    /// Checks that no slot prefix is a prefix of another.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for (i, a) in self.slots.iter().enumerate() {
            for b in &self.slots[i + 1..] {
                if a.prefix.starts_with(b.prefix) || b.prefix.starts_with(a.prefix) {
                    return Err(LayoutError::PrefixCollision {
                        first: a.name,
                        second: b.name,
                    });
                }
            }
        }
        Ok(())
    }

    /// Succeeds when `current` is a strict prefix of `self` and `self` is
    /// well-formed.
    pub fn extends(&self, current: &StorageLayout) -> Result<(), LayoutError> {
        self.validate()?;
        if self.slots.len() <= current.slots.len() {
            return Err(LayoutError::NotAnExtension {
                current: current.version,
                target: self.version,
            });
        }
        for (index, (old, new)) in current.slots.iter().zip(self.slots).enumerate() {
            if old != new {
                return Err(LayoutError::SlotMismatch {
                    index,
                    expected: old.name,
                    found: new.name,
                });
            }
        }
        Ok(())
    }

    /// BLAKE3 over the version and every `name || prefix` pair, in order.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(&self.version.to_be_bytes());
        for slot in self.slots {
            preimage.extend_from_slice(slot.name.as_bytes());
            preimage.push(0x00);
            preimage.extend_from_slice(slot.prefix);
            preimage.push(0x00);
        }
        domain_separated_hash(LAYOUT_FINGERPRINT_DOMAIN, &preimage)
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Checks a persisted fingerprint against this layout.
    pub fn verify_fingerprint(&self, stored: &[u8; 32]) -> Result<(), LayoutError> {
        if &self.fingerprint() == stored {
            Ok(())
        } else {
            Err(LayoutError::FingerprintMismatch {
                version: self.version,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// LogicVersion
// ---------------------------------------------------------------------------

/// The logic revision a proxy dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicVersion {
    /// Deposit and withdraw.
    V1,
    /// Adds ledger and external transfers.
    V2,
}

impl LogicVersion {
    pub const LATEST: LogicVersion = LogicVersion::V2;

    pub fn layout(&self) -> &'static StorageLayout {
        match self {
            LogicVersion::V1 => &LAYOUT_V1,
            LogicVersion::V2 => &LAYOUT_V2,
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.layout().version
    }

    pub fn from_u32(version: u32) -> Result<Self, LayoutError> {
        match version {
            1 => Ok(LogicVersion::V1),
            2 => Ok(LogicVersion::V2),
            other => Err(LayoutError::UnknownVersion(other)),
        }
    }
}

impl fmt::Display for LogicVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u32())
    }
}

impl FromStr for LogicVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(['v', 'V']);
        let n: u32 = digits
            .parse()
            .map_err(|_| format!("invalid logic version: {}", s))?;
        LogicVersion::from_u32(n).map_err(|e| e.to_string())
    }
}
