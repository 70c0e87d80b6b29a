//! # Cryptographic Primitives
//!
//! Thin wrappers over audited implementations:
//!
//! - **Ed25519** for self-service transfer authorizations.
//! - **BLAKE3** for address derivation and layout fingerprints.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, domain_separated_hash};
pub use keys::Keypair;
pub use signatures::{verify_raw, SignatureError};
