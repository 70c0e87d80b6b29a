//! # Addresses & Asset Identifiers
//!
//! An [`Address`] is the 20-byte identity of anything that can hold value:
//! a depositor, an operator, a token contract, or the bank itself. The ledger
//! never stores accounts as structs -- an address is only ever a key.
//!
//! An [`AssetId`] names *what* is being held. It is either the native coin or
//! the address of a fungible-token contract. On disk the native coin is the
//! all-zero address, so the zero address can never be a token.
//!
//! ## Derivation
//!
//! Signing identities get their address from their Ed25519 public key:
//!
//! ```text
//! address = BLAKE3(public_key)[12..32]
//! ```
//!
//! Named devnet accounts and contracts get theirs from a domain-separated
//! label hash, so the same label always lands on the same address.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::ADDRESS_LENGTH;
use crate::crypto::hash::blake3_hash;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing addresses or asset identifiers from text.
#[derive(Debug, Error, PartialEq)]
pub enum AddressError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address. Doubles as the native-coin sentinel.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw address bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses an address from a byte slice of exactly 20 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; ADDRESS_LENGTH] = slice
            .try_into()
            .map_err(|_| AddressError::InvalidLength(slice.len()))?;
        Ok(Self(bytes))
    }

    /// Returns the raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// `true` for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Derives the address controlled by an Ed25519 public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest = blake3_hash(public_key);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[32 - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Derives a deterministic address from a human-readable label.
    ///
    /// Used for devnet accounts ("alice", "treasury") and for contract
    /// addresses, which are labelled by their deployer.
    pub fn from_label(label: &str) -> Self {
        let mut preimage = Vec::with_capacity(label.len() + 16);
        preimage.extend_from_slice(b"vaultbank/label");
        preimage.push(0x00);
        preimage.extend_from_slice(label.as_bytes());
        let digest = blake3_hash(&preimage);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[..ADDRESS_LENGTH]);
        Self(bytes)
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses hex with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed)?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..)", &self.to_hex()[..10])
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::from_hex(&s).map_err(de::Error::custom)
        } else {
            let bytes = <[u8; ADDRESS_LENGTH]>::deserialize(deserializer)?;
            Ok(Address(bytes))
        }
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// What a ledger entry is denominated in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetId {
    /// The platform's native coin.
    Native,
    /// A fungible token, identified by its contract address.
    Token(Address),
}

impl AssetId {
    /// Maps an address onto an asset id; the zero address is the native coin.
    pub fn from_address(address: Address) -> Self {
        if address.is_zero() {
            AssetId::Native
        } else {
            AssetId::Token(address)
        }
    }

    /// The on-disk address form: zero for native, the token address otherwise.
    pub fn to_address(&self) -> Address {
        match self {
            AssetId::Native => Address::ZERO,
            AssetId::Token(address) => *address,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, AssetId::Native)
    }

    /// The token contract address, or `None` for the native coin.
    pub fn token(&self) -> Option<Address> {
        match self {
            AssetId::Native => None,
            AssetId::Token(address) => Some(*address),
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => write!(f, "native"),
            AssetId::Token(address) => write!(f, "{}", address),
        }
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => write!(f, "AssetId::Native"),
            AssetId::Token(address) => write!(f, "AssetId::Token({:?})", address),
        }
    }
}

impl FromStr for AssetId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("native") {
            return Ok(AssetId::Native);
        }
        Address::from_hex(s).map(AssetId::from_address)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.to_address().serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(de::Error::custom)
        } else {
            Address::deserialize(deserializer).map(AssetId::from_address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_with_and_without_prefix() {
        let addr = Address::from_label("alice");
        let hex = addr.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(Address::from_hex(&hex).unwrap(), addr);
        assert_eq!(Address::from_hex(&hex[2..]).unwrap(), addr);
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(
            Address::from_hex("0xdeadbeef"),
            Err(AddressError::InvalidLength(4))
        );
    }

    #[test]
    fn labels_are_deterministic_and_distinct() {
        assert_eq!(Address::from_label("bob"), Address::from_label("bob"));
        assert_ne!(Address::from_label("bob"), Address::from_label("carol"));
        assert!(!Address::from_label("bob").is_zero());
    }

    #[test]
    fn zero_address_is_native_asset() {
        assert_eq!(AssetId::from_address(Address::ZERO), AssetId::Native);
        assert_eq!(AssetId::Native.to_address(), Address::ZERO);
        let token = Address::from_label("dai");
        assert_eq!(AssetId::from_address(token), AssetId::Token(token));
        assert_eq!(AssetId::Token(token).token(), Some(token));
    }

    #[test]
    fn asset_parses_native_keyword_and_zero_hex() {
        assert_eq!("native".parse::<AssetId>().unwrap(), AssetId::Native);
        assert_eq!("NATIVE".parse::<AssetId>().unwrap(), AssetId::Native);
        let zero = Address::ZERO.to_hex();
        assert_eq!(zero.parse::<AssetId>().unwrap(), AssetId::Native);
    }

    #[test]
    fn json_uses_hex_strings() {
        let token = Address::from_label("dai");
        let json = serde_json::to_string(&AssetId::Token(token)).unwrap();
        assert_eq!(json, format!("\"{}\"", token.to_hex()));
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AssetId::Token(token));
        assert_eq!(serde_json::to_string(&AssetId::Native).unwrap(), "\"native\"");
    }

    #[test]
    fn bincode_uses_raw_bytes() {
        let addr = Address::from_label("alice");
        let bytes = bincode::serialize(&addr).unwrap();
        assert_eq!(bytes.len(), ADDRESS_LENGTH);
        let back: Address = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, addr);
    }
}
