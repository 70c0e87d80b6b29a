// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VaultBank Protocol: Core Library
//!
//! The primitives a custodial bank is built from: who may do what, whether
//! the bank is open, who is owed what, and where it all lives on disk.
//!
//! The logic revisions themselves (deposit/withdraw, transfer) and the
//! upgradeable proxy live in `vaultbank-contracts`. This crate holds what
//! every revision shares, so that a later revision reads exactly what an
//! earlier one wrote.
//!
//! ## Architecture
//!
//! - **address**: 20-byte addresses and asset identifiers.
//! - **access**: owner/admin roles and the authorization check.
//! - **pause**: the circuit breaker and its policy.
//! - **ledger**: `(account, asset) → amount` with checked arithmetic.
//! - **authorization**: ed25519-signed self-service transfers and nonces.
//! - **storage**: stores, stable keys, versioned layouts, the call overlay.
//! - **vault**: custody collaborators: native coin, tokens, registry.
//! - **events** / **error**: what entry points emit and return.
//! - **crypto**: BLAKE3 and Ed25519 wrappers.
//! - **config**: constants and runtime configuration.
//!
//! ## Invariants
//!
//! 1. No ledger entry is ever negative; every mutation is checked.
//! 2. For every asset, the ledger total never exceeds custody.
//! 3. A failed entry point leaves ledger, roles and pause flag unchanged.
//! 4. Storage keys never change meaning across logic revisions.

pub mod access;
pub mod address;
pub mod authorization;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod ledger;
pub mod pause;
pub mod storage;
pub mod vault;

pub use address::{Address, AssetId};
pub use error::{BankError, BankResult};
pub use events::{BankEvent, Receipt};
