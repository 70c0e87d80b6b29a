//! # Vault Module: Custody Collaborators
//!
//! Where the bank's custody physically lives. The bank's ledger says who is
//! owed what; the vault says what the bank actually holds. The solvency
//! invariant compares the two: for every asset, the ledger total must never
//! exceed custody.
//!
//! ## Architecture
//!
//! ```text
//! native.rs  : NativeCoin: platform coin balances, receive hooks
//! token.rs   : FungibleToken interface + StandardToken implementation
//! registry.rs: TokenRegistry: token contracts by address
//! ```
//!
//! All amounts are `u64` in the smallest unit. Every collaborator persists
//! through a [`Store`](crate::storage::Store), so custody survives a restart
//! alongside the ledger.

pub mod native;
pub mod registry;
pub mod token;

use std::sync::Arc;

pub use native::{NativeCoin, NativeError, ReceiveHook};
pub use registry::TokenRegistry;
pub use token::{FungibleToken, StandardToken, TokenError, TokenInfo};

use crate::address::{Address, AssetId};

/// Handles to every asset transport the bank moves value through.
#[derive(Debug, Clone)]
pub struct Custody {
    pub native: Arc<NativeCoin>,
    pub tokens: Arc<TokenRegistry>,
}

impl Custody {
    pub fn new(native: Arc<NativeCoin>, tokens: Arc<TokenRegistry>) -> Self {
        Self { native, tokens }
    }

    /// What `holder` actually holds of `asset`, per the collaborator.
    pub fn held_by(&self, holder: &Address, asset: &AssetId) -> Result<u64, String> {
        match asset {
            AssetId::Native => self.native.balance_of(holder).map_err(|e| e.to_string()),
            AssetId::Token(token) => self
                .tokens
                .resolve(token)
                .and_then(|t| t.balance_of(holder))
                .map_err(|e| e.to_string()),
        }
    }
}
