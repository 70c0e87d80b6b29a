//! # Hashing Utilities
//!
//! BLAKE3 is the only hash function VaultBank uses. It derives addresses
//! from public keys, fingerprints storage layouts, and binds signed transfer
//! authorizations to a domain.

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use vaultbank_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"vaultbank");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute a domain-separated hash using BLAKE3's `derive_key` mode.
///
/// `domain_separated_hash("a", data)` and `domain_separated_hash("b", data)`
/// never collide, because the context string selects a different IV.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake3_is_deterministic() {
        assert_eq!(blake3_hash(b"abc"), blake3_hash(b"abc"));
        assert_ne!(blake3_hash(b"abc"), blake3_hash(b"abd"));
    }

    #[test]
    fn domain_separation_changes_output() {
        let a = domain_separated_hash("vaultbank layout", b"slots");
        let b = domain_separated_hash("vaultbank transfer", b"slots");
        assert_ne!(a, b);
    }
}
