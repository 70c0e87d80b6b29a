//! Proxy metadata: the bank's own address, the active logic version and
//! the fingerprint of the layout the data was written under.

use vaultbank_protocol::access;
use vaultbank_protocol::storage::keys;
use vaultbank_protocol::storage::{LogicVersion, StateTx, StateView, StoreResult};
use vaultbank_protocol::{Address, BankError, BankResult};

/// `true` once anything has initialized this storage.
pub fn is_initialized(view: &impl StateView) -> StoreResult<bool> {
    Ok(view.read(&keys::bank_address())?.is_some() || access::load_roles(view)?.is_some())
}

pub fn bank_address(view: &impl StateView) -> BankResult<Address> {
    view.load(&keys::bank_address())?
        .ok_or(BankError::NotInitialized)
}

/// The stored logic version, without checking the layout fingerprint.
pub fn logic_version(view: &impl StateView) -> BankResult<LogicVersion> {
    let raw: u32 = view
        .load(&keys::logic_version())?
        .ok_or(BankError::NotInitialized)?;
    Ok(LogicVersion::from_u32(raw)?)
}

/// The stored logic version, after checking that the stored fingerprint is
/// the one its layout produces.
pub fn verified_version(view: &impl StateView) -> BankResult<LogicVersion> {
    let version = logic_version(view)?;
    let fingerprint: [u8; 32] = view
        .load(&keys::layout_fingerprint())?
        .ok_or(BankError::NotInitialized)?;
    version.layout().verify_fingerprint(&fingerprint)?;
    Ok(version)
}

pub fn store_bank_address(tx: &mut StateTx<'_>, address: &Address) -> StoreResult<()> {
    tx.save(keys::bank_address(), address)
}

/// Records `version` and its layout fingerprint. Touches nothing else.
pub fn store_version(tx: &mut StateTx<'_>, version: LogicVersion) -> StoreResult<()> {
    tx.save(keys::logic_version(), &version.as_u32())?;
    tx.save(keys::layout_fingerprint(), &version.layout().fingerprint())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultbank_protocol::storage::{MemoryStore, Snapshot};

    #[test]
    fn empty_storage_is_uninitialized() {
        let store = MemoryStore::new();
        let view = Snapshot::new(&store);
        assert!(!is_initialized(&view).unwrap());
        assert!(matches!(logic_version(&view), Err(BankError::NotInitialized)));
    }

    #[test]
    fn version_roundtrip_with_fingerprint() {
        let store = MemoryStore::new();
        let mut tx = StateTx::new(&store);
        store_version(&mut tx, LogicVersion::V2).unwrap();
        tx.commit().unwrap();

        assert_eq!(verified_version(&Snapshot::new(&store)).unwrap(), LogicVersion::V2);
    }

    #[test]
    fn tampered_fingerprint_detected() {
        let store = MemoryStore::new();
        let mut tx = StateTx::new(&store);
        store_version(&mut tx, LogicVersion::V1).unwrap();
        tx.save(keys::layout_fingerprint(), &[0u8; 32]).unwrap();
        tx.commit().unwrap();

        let err = verified_version(&Snapshot::new(&store)).unwrap_err();
        assert_eq!(err.kind(), "IncompatibleLayout");
    }
}
