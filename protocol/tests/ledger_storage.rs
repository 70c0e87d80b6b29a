//! Integration tests for the protocol primitives over on-disk storage.
//!
//! These compose the pieces a bank call is built from (overlay, ledger,
//! roles, pause flag, nonces, custody collaborators) against a real sled
//! database, and check that what lands on disk is exactly what a committed
//! call wrote.
//!
//! Each test gets its own temporary directory. No shared state.

use std::sync::Arc;

use vaultbank_protocol::access::{self, Roles};
use vaultbank_protocol::authorization::{self, TransferAuthorization, TransferIntent};
use vaultbank_protocol::crypto::Keypair;
use vaultbank_protocol::ledger;
use vaultbank_protocol::pause::{self, PauseState};
use vaultbank_protocol::storage::{LogicVersion, SledStore, Snapshot, StateTx, Store};
use vaultbank_protocol::vault::{
    Custody, FungibleToken, NativeCoin, StandardToken, TokenRegistry,
};
use vaultbank_protocol::{Address, AssetId, BankError};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn alice() -> Address {
    Address::from_label("alice")
}

fn bob() -> Address {
    Address::from_label("bob")
}

fn bank() -> Address {
    Address::from_label("bank")
}

fn open(dir: &tempfile::TempDir) -> SledStore {
    SledStore::open(dir.path()).expect("open sled")
}

// ---------------------------------------------------------------------------
// Overlay + ledger
// ---------------------------------------------------------------------------

#[test]
fn committed_ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = open(&dir);
        let mut tx = StateTx::new(&db);
        ledger::credit(&mut tx, &alice(), &AssetId::Native, 500).unwrap();
        ledger::move_balance(&mut tx, &alice(), &bob(), &AssetId::Native, 200).unwrap();
        access::store_roles(&mut tx, &Roles::new(alice(), bob()).unwrap()).unwrap();
        pause::store(&mut tx, PauseState::Paused).unwrap();
        tx.commit().unwrap();
        db.flush().unwrap();
    }

    let db = open(&dir);
    let view = Snapshot::new(&db);
    assert_eq!(ledger::balance_of(&view, &alice(), &AssetId::Native).unwrap(), 300);
    assert_eq!(ledger::balance_of(&view, &bob(), &AssetId::Native).unwrap(), 200);
    assert_eq!(ledger::total(&view, &AssetId::Native).unwrap(), 500);
    assert_eq!(access::load_roles(&view).unwrap().unwrap().admin, bob());
    assert!(pause::load(&view).unwrap().is_paused());
}

#[test]
fn dropped_overlay_reverts_flushed_debit_on_disk() {
    let db = SledStore::open_temporary().unwrap();
    {
        let mut tx = StateTx::new(&db);
        ledger::credit(&mut tx, &alice(), &AssetId::Native, 100).unwrap();
        tx.commit().unwrap();
    }

    {
        let mut tx = StateTx::new(&db);
        ledger::debit(&mut tx, &alice(), &AssetId::Native, 60).unwrap();
        tx.flush().unwrap();
        // Visible to any other reader while the call is in flight.
        assert_eq!(
            ledger::balance_of(&Snapshot::new(&db), &alice(), &AssetId::Native).unwrap(),
            40
        );
        // Dropped without commit.
    }

    assert_eq!(
        ledger::balance_of(&Snapshot::new(&db), &alice(), &AssetId::Native).unwrap(),
        100
    );
}

#[test]
fn failed_debit_stages_nothing() {
    let db = SledStore::open_temporary().unwrap();
    let mut tx = StateTx::new(&db);
    ledger::credit(&mut tx, &alice(), &AssetId::Native, 10).unwrap();
    tx.commit().unwrap();

    let mut tx = StateTx::new(&db);
    let err = ledger::debit(&mut tx, &alice(), &AssetId::Native, 11).unwrap_err();
    assert!(matches!(err, ledger::LedgerError::InsufficientBalance { available: 10, .. }));
    assert_eq!(tx.pending_len(), 0);
}

// ---------------------------------------------------------------------------
// Namespaces and custody
// ---------------------------------------------------------------------------

#[test]
fn custody_trees_are_isolated_and_persist() {
    let dir = tempfile::tempdir().unwrap();
    let token_address;
    {
        let db = open(&dir);
        let coin = NativeCoin::new(Arc::new(db.namespace("coin").unwrap()));
        coin.mint(&alice(), 75).unwrap();

        let token = StandardToken::create(
            Arc::new(db.namespace("token-usd").unwrap()),
            "Dollar",
            "USD",
            2,
            bob(),
        )
        .unwrap();
        token.mint(bob(), alice(), 30).unwrap();
        token_address = token.address();

        let mut tx = StateTx::new(&db);
        ledger::credit(&mut tx, &alice(), &AssetId::Token(token_address), 5).unwrap();
        tx.commit().unwrap();
        db.flush().unwrap();
    }

    let db = open(&dir);
    let mut names = db.namespaces();
    names.sort();
    assert_eq!(names, vec!["bank", "coin", "token-usd"]);

    let coin = Arc::new(NativeCoin::new(Arc::new(db.namespace("coin").unwrap())));
    let token = Arc::new(StandardToken::open(Arc::new(db.namespace("token-usd").unwrap())).unwrap());
    let tokens = Arc::new(TokenRegistry::new());
    tokens.register(token.clone()).unwrap();
    let custody = Custody::new(coin, tokens);

    assert_eq!(custody.held_by(&alice(), &AssetId::Native).unwrap(), 75);
    assert_eq!(custody.held_by(&alice(), &AssetId::Token(token_address)).unwrap(), 30);
    assert_eq!(token.info().unwrap().total_supply, 30);
    // The bank tree only holds the ledger entry.
    assert_eq!(db.scan_prefix(b"").unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Signed transfers
// ---------------------------------------------------------------------------

#[test]
fn authorization_survives_json_and_consumes_nonce_once() {
    let db = SledStore::open_temporary().unwrap();
    let keypair = Keypair::from_seed(&[11u8; 32]);
    let holder = keypair.address();

    let auth = TransferIntent {
        from: holder,
        to: bob(),
        asset: AssetId::Native,
        amount: 12,
        external: false,
        nonce: 0,
    }
    .sign(&bank(), &keypair);
    let json = serde_json::to_string(&auth).unwrap();
    let decoded: TransferAuthorization = serde_json::from_str(&json).unwrap();
    decoded.check_signer().unwrap();
    decoded.check_signature(&bank()).unwrap();

    let mut tx = StateTx::new(&db);
    authorization::consume_nonce(&mut tx, &holder, decoded.intent.nonce).unwrap();
    tx.commit().unwrap();
    assert_eq!(authorization::nonce_of(&Snapshot::new(&db), &holder).unwrap(), 1);

    let mut tx = StateTx::new(&db);
    let err = authorization::consume_nonce(&mut tx, &holder, decoded.intent.nonce).unwrap_err();
    assert!(matches!(err, BankError::InvalidNonce { expected: 1, got: 0, .. }));
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[test]
fn every_revision_extends_its_predecessor() {
    let versions = [LogicVersion::V1, LogicVersion::V2];
    for pair in versions.windows(2) {
        pair[1].layout().extends(pair[0].layout()).unwrap();
        assert!(pair[0].layout().extends(pair[1].layout()).is_err());
    }
    assert_eq!(*versions.last().unwrap(), LogicVersion::LATEST);
}
