//! Key encoding for every value the bank persists.
//!
//! These byte strings are the storage contract between logic revisions.
//! A new revision may add keys under a new slot prefix; it must never
//! change one of these.

use crate::address::{Address, AssetId};
use crate::config::{
    ADDRESS_LENGTH, PREFIX_LEDGER, PREFIX_META, PREFIX_PAUSE, PREFIX_ROLES,
    PREFIX_TRANSFER_NONCES,
};

fn with_suffix(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(suffix);
    key
}

// -- meta/ ------------------------------------------------------------------

/// The proxy's own address (the custody holder).
pub fn bank_address() -> Vec<u8> {
    with_suffix(PREFIX_META, b"address")
}

/// The active logic version.
pub fn logic_version() -> Vec<u8> {
    with_suffix(PREFIX_META, b"logic_version")
}

/// Fingerprint of the layout the stored data was written under.
pub fn layout_fingerprint() -> Vec<u8> {
    with_suffix(PREFIX_META, b"layout_fingerprint")
}

// -- roles/ -----------------------------------------------------------------

pub fn owner() -> Vec<u8> {
    with_suffix(PREFIX_ROLES, b"owner")
}

pub fn admin() -> Vec<u8> {
    with_suffix(PREFIX_ROLES, b"admin")
}

// -- pause/ -----------------------------------------------------------------

pub fn pause_flag() -> Vec<u8> {
    with_suffix(PREFIX_PAUSE, b"flag")
}

// -- ledger/ ----------------------------------------------------------------

/// `ledger/ || account (20) || asset (20)`. The native coin is the zero
/// address in the asset position.
pub fn ledger_entry(account: &Address, asset: &AssetId) -> Vec<u8> {
    let mut key = Vec::with_capacity(PREFIX_LEDGER.len() + 2 * ADDRESS_LENGTH);
    key.extend_from_slice(PREFIX_LEDGER);
    key.extend_from_slice(account.as_bytes());
    key.extend_from_slice(asset.to_address().as_bytes());
    key
}

/// Inverse of [`ledger_entry`]. Returns `None` for keys of any other shape.
pub fn parse_ledger_entry(key: &[u8]) -> Option<(Address, AssetId)> {
    let rest = key.strip_prefix(PREFIX_LEDGER)?;
    if rest.len() != 2 * ADDRESS_LENGTH {
        return None;
    }
    let account = Address::try_from_slice(&rest[..ADDRESS_LENGTH]).ok()?;
    let asset = Address::try_from_slice(&rest[ADDRESS_LENGTH..]).ok()?;
    Some((account, AssetId::from_address(asset)))
}

// -- nonces/ ----------------------------------------------------------------

pub fn transfer_nonce(account: &Address) -> Vec<u8> {
    with_suffix(PREFIX_TRANSFER_NONCES, account.as_bytes())
}
