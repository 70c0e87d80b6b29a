//! # Signed Transfer Authorizations
//!
//! A ledger account can move its own balance without an operator by signing
//! a [`TransferIntent`] with the Ed25519 key its address derives from. Anyone
//! may relay the resulting [`TransferAuthorization`].
//!
//! ## Canonical message
//!
//! ```text
//! domain tag ‖ 0x00 ‖ bank (20) ‖ from (20) ‖ to (20) ‖ asset (20)
//!            ‖ amount (u64 BE) ‖ external (1) ‖ nonce (u64 BE)
//! ```
//!
//! The bank address binds a signature to one deployment. The nonce must equal
//! the account's stored nonce, which increments on every accepted
//! authorization, so each signature is good for exactly one transfer.

use serde::{Deserialize, Serialize};

use crate::access::AccessError;
use crate::address::{Address, AssetId};
use crate::config::TRANSFER_SIGNING_DOMAIN;
use crate::crypto::keys::Keypair;
use crate::crypto::signatures::verify_raw;
use crate::error::BankError;
use crate::storage::keys;
use crate::storage::{StateTx, StateView, StoreResult};

/// What the account holder agrees to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub from: Address,
    pub to: Address,
    pub asset: AssetId,
    pub amount: u64,
    /// Send the value out of custody instead of crediting `to` in the ledger.
    #[serde(default)]
    pub external: bool,
    pub nonce: u64,
}

impl TransferIntent {
    /// The bytes that get signed, bound to `bank`.
    pub fn signing_message(&self, bank: &Address) -> Vec<u8> {
        let mut msg = Vec::with_capacity(TRANSFER_SIGNING_DOMAIN.len() + 1 + 80 + 17);
        msg.extend_from_slice(TRANSFER_SIGNING_DOMAIN.as_bytes());
        msg.push(0x00);
        msg.extend_from_slice(bank.as_bytes());
        msg.extend_from_slice(self.from.as_bytes());
        msg.extend_from_slice(self.to.as_bytes());
        msg.extend_from_slice(self.asset.to_address().as_bytes());
        msg.extend_from_slice(&self.amount.to_be_bytes());
        msg.push(self.external as u8);
        msg.extend_from_slice(&self.nonce.to_be_bytes());
        msg
    }

    /// Signs this intent for `bank`.
    pub fn sign(self, bank: &Address, keypair: &Keypair) -> TransferAuthorization {
        let signature = keypair.sign(&self.signing_message(bank));
        TransferAuthorization {
            intent: self,
            public_key: keypair.public_key_bytes(),
            signature,
        }
    }
}

/// A signed intent, ready to relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAuthorization {
    #[serde(flatten)]
    pub intent: TransferIntent,
    #[serde(with = "hex_array")]
    pub public_key: [u8; 32],
    #[serde(with = "hex_array")]
    pub signature: [u8; 64],
}

impl TransferAuthorization {
    /// Checks that the key controls `from`. Does not touch the nonce.
    pub fn check_signer(&self) -> Result<(), BankError> {
        let signer = Address::from_public_key(&self.public_key);
        if signer != self.intent.from {
            return Err(AccessError::NotAccountHolder {
                account: self.intent.from,
                signer,
            }
            .into());
        }
        Ok(())
    }

    /// Verifies the signature over the canonical message for `bank`.
    pub fn check_signature(&self, bank: &Address) -> Result<(), BankError> {
        verify_raw(
            &self.public_key,
            &self.intent.signing_message(bank),
            &self.signature,
        )
        .map_err(|_| BankError::InvalidSignature)
    }
}

// ---------------------------------------------------------------------------
// Nonces
// ---------------------------------------------------------------------------

/// The next nonce `account` must sign with. Absent = 0.
pub fn nonce_of(view: &impl StateView, account: &Address) -> StoreResult<u64> {
    Ok(view.load(&keys::transfer_nonce(account))?.unwrap_or(0))
}

/// Checks `presented` against the stored nonce and stages the increment.
pub fn consume_nonce(
    tx: &mut StateTx<'_>,
    account: &Address,
    presented: u64,
) -> Result<(), BankError> {
    let expected = nonce_of(&*tx, account)?;
    if presented != expected {
        return Err(BankError::InvalidNonce {
            account: *account,
            expected,
            got: presented,
        });
    }
    let next = expected.checked_add(1).ok_or(BankError::InvalidNonce {
        account: *account,
        expected,
        got: presented,
    })?;
    tx.save(keys::transfer_nonce(account), &next)?;
    Ok(())
}

/// Hex (de)serialization for fixed-size byte arrays.
mod hex_array {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| de::Error::custom(format!("expected {} bytes, got {}", N, len)))
    }
}
