//! # Digital Signatures
//!
//! Ed25519 verification for signed transfer authorizations.
//!
//! We use `ed25519-dalek`'s strict verification. Edge-case signatures that
//! lenient implementations accept are rejected here.

use ed25519_dalek::{Signature, VerifyingKey};
use thiserror::Error;

/// Errors during signature verification.
///
/// Intentionally vague about why a signature failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Verify a signature from raw byte components.
pub fn verify_raw(
    public_key_bytes: &[u8; 32],
    message: &[u8],
    signature_bytes: &[u8; 64],
) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key_bytes).map_err(|_| SignatureError::InvalidPublicKey)?;
    let signature = Signature::from_bytes(signature_bytes);

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;

    #[test]
    fn valid_signature_verifies() {
        let kp = Keypair::generate();
        let msg = b"move 100 from alice to bob";
        let sig = kp.sign(msg);
        assert_eq!(verify_raw(&kp.public_key_bytes(), msg, &sig), Ok(()));
    }

    #[test]
    fn tampered_message_rejected() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"move 100");
        assert_eq!(
            verify_raw(&kp.public_key_bytes(), b"move 900", &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn wrong_key_rejected() {
        let signer = Keypair::generate();
        let other = Keypair::generate();
        let sig = signer.sign(b"hello");
        assert!(verify_raw(&other.public_key_bytes(), b"hello", &sig).is_err());
    }
}
