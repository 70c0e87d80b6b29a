//! # Fungible Tokens
//!
//! The bank custodies any asset contract that implements [`FungibleToken`]:
//! balance query, transfer, transfer-from-with-approval, approve. The bank
//! itself never mints or burns; it only moves tokens between a depositor and
//! its own address.
//!
//! [`StandardToken`] is the in-process implementation the node and the test
//! suites run against. It keeps its balances, allowances and metadata in its
//! own [`Store`] namespace and gates minting on the issuer.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::address::Address;
use crate::config::{PREFIX_TOKEN_ALLOWANCE, PREFIX_TOKEN_BALANCE, PREFIX_TOKEN_INFO};
use crate::storage::{decode, encode, Store, StoreError, WriteBatch};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by token contracts and the token registry.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The holder does not have enough tokens.
    #[error("insufficient balance: {holder} has {balance}, tried to move {amount}")]
    InsufficientBalance {
        holder: Address,
        balance: u64,
        amount: u64,
    },

    /// `transfer_from` exceeds what the owner approved for the spender.
    #[error("insufficient allowance: {spender} may spend {allowance} of {owner}'s tokens, tried {amount}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: u64,
        amount: u64,
    },

    /// The caller is not the issuer of this token.
    #[error("unauthorized: only the issuer can mint this token")]
    UnauthorizedMint,

    /// A supply or balance overflow would occur.
    #[error("supply overflow: minting {amount} would exceed u64::MAX")]
    SupplyOverflow { amount: u64 },

    /// Tokens cannot be sent to or approved for the zero address.
    #[error("zero address")]
    ZeroAddress,

    /// A token with this symbol is already registered.
    #[error("duplicate symbol: a token with symbol '{0}' already exists")]
    DuplicateSymbol(String),

    /// No token is registered at this address.
    #[error("token not found: {0}")]
    TokenNotFound(Address),

    /// The store holds no token metadata.
    #[error("token store is not initialized")]
    Uninitialized,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Collaborator interface
// ---------------------------------------------------------------------------

/// The interface the bank needs from an asset contract.
///
/// `caller`/`spender` arguments stand in for the message sender: the token
/// trusts them the way an on-chain token trusts the transaction signer.
pub trait FungibleToken: Send + Sync {
    fn address(&self) -> Address;

    fn symbol(&self) -> String;

    fn balance_of(&self, holder: &Address) -> Result<u64, TokenError>;

    fn allowance(&self, owner: &Address, spender: &Address) -> Result<u64, TokenError>;

    /// Moves `amount` from `caller` to `to`.
    fn transfer(&self, caller: Address, to: Address, amount: u64) -> Result<(), TokenError>;

    /// Moves `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), TokenError>;

    /// Sets `spender`'s allowance over `owner`'s tokens.
    fn approve(&self, owner: Address, spender: Address, amount: u64) -> Result<(), TokenError>;
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata and supply information for a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Contract address, derived from issuer and symbol.
    pub address: Address,
    /// Human-readable name (e.g., "Vault Dollar").
    pub name: String,
    /// Ticker symbol (e.g., "vUSD"). Unique within a registry.
    pub symbol: String,
    /// Number of decimal places.
    pub decimals: u8,
    /// The only address allowed to mint.
    pub issuer: Address,
    /// Current total supply in the smallest denomination.
    pub total_supply: u64,
    pub created_at: DateTime<Utc>,
}

impl TokenInfo {
    /// The address a token created by `issuer` with `symbol` lives at.
    pub fn derive_address(issuer: &Address, symbol: &str) -> Address {
        Address::from_label(&format!("token/{}/{}", issuer.to_hex(), symbol))
    }
}

// ---------------------------------------------------------------------------
// StandardToken
// ---------------------------------------------------------------------------

/// Store-backed fungible token.
pub struct StandardToken {
    address: Address,
    symbol: String,
    store: Arc<dyn Store>,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

fn info_key() -> Vec<u8> {
    let mut key = PREFIX_TOKEN_INFO.to_vec();
    key.extend_from_slice(b"token");
    key
}

fn balance_key(holder: &Address) -> Vec<u8> {
    let mut key = PREFIX_TOKEN_BALANCE.to_vec();
    key.extend_from_slice(holder.as_bytes());
    key
}

fn allowance_key(owner: &Address, spender: &Address) -> Vec<u8> {
    let mut key = PREFIX_TOKEN_ALLOWANCE.to_vec();
    key.extend_from_slice(owner.as_bytes());
    key.extend_from_slice(spender.as_bytes());
    key
}

fn put_amount(batch: &mut WriteBatch, key: Vec<u8>, amount: u64) -> Result<(), TokenError> {
    if amount == 0 {
        batch.delete(key);
    } else {
        batch.put(key, encode(&amount)?);
    }
    Ok(())
}

impl StandardToken {
    /// Creates a token with zero supply in an empty store.
    pub fn create(
        store: Arc<dyn Store>,
        name: &str,
        symbol: &str,
        decimals: u8,
        issuer: Address,
    ) -> Result<Self, TokenError> {
        if issuer.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let info = TokenInfo {
            address: TokenInfo::derive_address(&issuer, symbol),
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            issuer,
            total_supply: 0,
            created_at: Utc::now(),
        };
        let mut batch = WriteBatch::new();
        batch.put(info_key(), encode(&info)?);
        store.apply(&batch)?;

        Ok(Self {
            address: info.address,
            symbol: info.symbol,
            store,
            write_lock: Mutex::new(()),
        })
    }

    /// Re-opens a token previously created in `store`.
    pub fn open(store: Arc<dyn Store>) -> Result<Self, TokenError> {
        let bytes = store.get(&info_key())?.ok_or(TokenError::Uninitialized)?;
        let info: TokenInfo = decode(&bytes)?;
        Ok(Self {
            address: info.address,
            symbol: info.symbol,
            store,
            write_lock: Mutex::new(()),
        })
    }

    pub fn info(&self) -> Result<TokenInfo, TokenError> {
        let bytes = self
            .store
            .get(&info_key())?
            .ok_or(TokenError::Uninitialized)?;
        Ok(decode(&bytes)?)
    }

    pub fn total_supply(&self) -> Result<u64, TokenError> {
        Ok(self.info()?.total_supply)
    }

    /// Issues new supply to `to`. Only the issuer may mint.
    pub fn mint(&self, caller: Address, to: Address, amount: u64) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let _guard = self.write_lock.lock();
        let mut info = self.info()?;
        if caller != info.issuer {
            return Err(TokenError::UnauthorizedMint);
        }

        info.total_supply = info
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;
        let balance = self
            .read_amount(&balance_key(&to))?
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;

        let mut batch = WriteBatch::new();
        batch.put(info_key(), encode(&info)?);
        put_amount(&mut batch, balance_key(&to), balance)?;
        self.store.apply(&batch)?;
        Ok(())
    }

    fn read_amount(&self, key: &[u8]) -> Result<u64, TokenError> {
        match self.store.get(key)? {
            Some(bytes) => Ok(decode(&bytes)?),
            None => Ok(0),
        }
    }

    /// Balance moves shared by `transfer` and `transfer_from`. Caller holds
    /// the write lock.
    fn stage_move(
        &self,
        batch: &mut WriteBatch,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let from_balance = self.read_amount(&balance_key(from))?;
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance {
                holder: *from,
                balance: from_balance,
                amount,
            })?;
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .read_amount(&balance_key(to))?
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;
        put_amount(batch, balance_key(from), remaining)?;
        put_amount(batch, balance_key(to), to_balance)?;
        Ok(())
    }
}

impl FungibleToken for StandardToken {
    fn address(&self) -> Address {
        self.address
    }

    fn symbol(&self) -> String {
        self.symbol.clone()
    }

    fn balance_of(&self, holder: &Address) -> Result<u64, TokenError> {
        self.read_amount(&balance_key(holder))
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Result<u64, TokenError> {
        self.read_amount(&allowance_key(owner, spender))
    }

    fn transfer(&self, caller: Address, to: Address, amount: u64) -> Result<(), TokenError> {
        let _guard = self.write_lock.lock();
        let mut batch = WriteBatch::new();
        self.stage_move(&mut batch, &caller, &to, amount)?;
        self.store.apply(&batch)?;
        Ok(())
    }

    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), TokenError> {
        let _guard = self.write_lock.lock();
        let allowance = self.read_amount(&allowance_key(&from, &spender))?;
        let remaining = allowance
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientAllowance {
                owner: from,
                spender,
                allowance,
                amount,
            })?;

        let mut batch = WriteBatch::new();
        self.stage_move(&mut batch, &from, &to, amount)?;
        put_amount(&mut batch, allowance_key(&from, &spender), remaining)?;
        self.store.apply(&batch)?;
        Ok(())
    }

    fn approve(&self, owner: Address, spender: Address, amount: u64) -> Result<(), TokenError> {
        if spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let _guard = self.write_lock.lock();
        let mut batch = WriteBatch::new();
        put_amount(&mut batch, allowance_key(&owner, &spender), amount)?;
        self.store.apply(&batch)?;
        Ok(())
    }
}

impl std::fmt::Debug for StandardToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardToken")
            .field("address", &self.address)
            .field("symbol", &self.symbol)
            .finish()
    }
}
