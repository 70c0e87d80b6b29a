//! Token registry: which asset contracts the node knows about, by address.

use dashmap::DashMap;
use std::sync::Arc;

use super::token::{FungibleToken, TokenError};
use crate::address::Address;

/// Concurrent address → token map with unique symbols.
#[derive(Default)]
pub struct TokenRegistry {
    tokens: DashMap<Address, Arc<dyn FungibleToken>>,
    symbols: DashMap<String, Address>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token. Fails on a zero address or a taken symbol.
    pub fn register(&self, token: Arc<dyn FungibleToken>) -> Result<Address, TokenError> {
        let address = token.address();
        if address.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let symbol = token.symbol();
        match self.symbols.entry(symbol.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(TokenError::DuplicateSymbol(symbol));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(address);
            }
        }
        self.tokens.insert(address, token);
        Ok(address)
    }

    pub fn get(&self, address: &Address) -> Option<Arc<dyn FungibleToken>> {
        self.tokens.get(address).map(|t| Arc::clone(t.value()))
    }

    /// Like [`get`](Self::get), but an unknown address is an error.
    pub fn resolve(&self, address: &Address) -> Result<Arc<dyn FungibleToken>, TokenError> {
        self.get(address).ok_or(TokenError::TokenNotFound(*address))
    }

    /// Registered token addresses, sorted.
    pub fn addresses(&self) -> Vec<Address> {
        let mut out: Vec<Address> = self.tokens.iter().map(|e| *e.key()).collect();
        out.sort();
        out
    }
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("tokens", &self.addresses())
            .finish()
    }
}
