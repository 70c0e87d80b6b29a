//! Shared fixtures for the contract integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use vaultbank_contracts::{BankProxy, Deployment};
use vaultbank_protocol::config::BankConfig;
use vaultbank_protocol::storage::{MemoryStore, Store};
use vaultbank_protocol::vault::{Custody, NativeCoin, StandardToken, TokenRegistry};
use vaultbank_protocol::{Address, AssetId, Receipt};

pub fn owner() -> Address {
    Address::from_label("owner")
}

pub fn admin() -> Address {
    Address::from_label("admin")
}

pub fn alice() -> Address {
    Address::from_label("alice")
}

pub fn bob() -> Address {
    Address::from_label("bob")
}

pub fn carol() -> Address {
    Address::from_label("carol")
}

pub fn issuer() -> Address {
    Address::from_label("issuer")
}

pub fn bank_address() -> Address {
    Address::from_label("vaultbank/test")
}

/// A deployed bank over in-memory storage.
pub struct Fixture {
    pub proxy: BankProxy,
    pub store: Arc<dyn Store>,
    pub coin: Arc<NativeCoin>,
    pub tokens: Arc<TokenRegistry>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(BankConfig::default())
    }

    pub fn with_config(config: BankConfig) -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let coin = Arc::new(NativeCoin::new(Arc::new(MemoryStore::new())));
        let tokens = Arc::new(TokenRegistry::new());
        let custody = Custody::new(coin.clone(), tokens.clone());
        let (proxy, _) = BankProxy::deploy(
            store.clone(),
            custody,
            config,
            Deployment {
                address: bank_address(),
                owner: owner(),
                admin: admin(),
            },
        )
        .unwrap();
        Self {
            proxy,
            store,
            coin,
            tokens,
        }
    }

    /// Issues and registers a token with zero supply.
    pub fn issue_token(&self, symbol: &str) -> Arc<StandardToken> {
        let token = Arc::new(
            StandardToken::create(Arc::new(MemoryStore::new()), symbol, symbol, 6, issuer())
                .unwrap(),
        );
        self.tokens.register(token.clone()).unwrap();
        token
    }

    pub fn fund_native(&self, account: &Address, amount: u64) {
        self.coin.mint(account, amount).unwrap();
    }

    pub fn balance(&self, account: &Address, asset: &AssetId) -> u64 {
        self.proxy.view().balance_of(account, asset).unwrap()
    }

    pub fn native_held(&self, holder: &Address) -> u64 {
        self.coin.balance_of(holder).unwrap()
    }

    pub fn upgrade(&mut self) -> Receipt {
        self.proxy
            .upgrade_to(owner(), vaultbank_protocol::storage::LogicVersion::V2)
            .unwrap()
    }

    pub fn assert_solvent(&self, asset: &AssetId) {
        let solvency = self.proxy.view().solvency(asset).unwrap();
        assert!(
            solvency.solvent,
            "ledger {} exceeds custody {}",
            solvency.ledger_total,
            solvency.custody
        );
    }
}
