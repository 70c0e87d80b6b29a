//! Integration tests for the transfer revision: operator transfers, external
//! transfers and signature-authorized self-service transfers.

mod common;

use std::sync::Arc;

use common::*;
use vaultbank_protocol::authorization::TransferIntent;
use vaultbank_protocol::crypto::Keypair;
use vaultbank_protocol::vault::{FungibleToken, ReceiveHook};
use vaultbank_protocol::{Address, AssetId, BankError, BankEvent};

fn upgraded() -> Fixture {
    let mut f = Fixture::new();
    f.upgrade();
    f
}

// ---------------------------------------------------------------------------
// Ledger transfers
// ---------------------------------------------------------------------------

#[test]
fn deposit_transfer_withdraw_scenario() {
    let mut f = upgraded();
    f.fund_native(&alice(), 100);

    f.proxy.deposit_native(alice(), 100).unwrap();
    assert_eq!(f.balance(&alice(), &AssetId::Native), 100);

    let receipt = f.proxy.transfer_native(admin(), alice(), bob(), 100).unwrap();
    assert_eq!(
        receipt.events,
        vec![BankEvent::LedgerTransfer {
            from: alice(),
            to: bob(),
            asset: AssetId::Native,
            amount: 100,
            external: false,
        }]
    );
    assert_eq!(f.balance(&alice(), &AssetId::Native), 0);
    assert_eq!(f.balance(&bob(), &AssetId::Native), 100);

    f.proxy.withdraw_native(bob(), 100).unwrap();
    assert_eq!(f.native_held(&bob()), 100);
    assert_eq!(f.balance(&bob(), &AssetId::Native), 0);
    f.assert_solvent(&AssetId::Native);
}

#[test]
fn ledger_transfer_does_not_touch_custody() {
    let mut f = upgraded();
    f.fund_native(&alice(), 100);
    f.proxy.deposit_native(alice(), 100).unwrap();
    f.proxy.transfer_native(owner(), alice(), bob(), 40).unwrap();
    assert_eq!(f.native_held(&bank_address()), 100);
    assert_eq!(f.proxy.view().solvency(&AssetId::Native).unwrap().ledger_total, 100);
}

#[test]
fn transfer_validation() {
    let mut f = upgraded();
    f.fund_native(&alice(), 10);
    f.proxy.deposit_native(alice(), 10).unwrap();

    assert_eq!(
        f.proxy.transfer_native(admin(), alice(), bob(), 0).unwrap_err().kind(),
        "ZeroAmount"
    );
    assert_eq!(
        f.proxy.transfer_native(admin(), alice(), bob(), 11).unwrap_err().kind(),
        "InsufficientBalance"
    );
    assert_eq!(
        f.proxy
            .transfer_native(admin(), alice(), Address::ZERO, 1)
            .unwrap_err()
            .kind(),
        "InvalidAddress"
    );
    assert_eq!(f.balance(&alice(), &AssetId::Native), 10);
    assert_eq!(f.balance(&bob(), &AssetId::Native), 0);
}

#[test]
fn account_holder_cannot_use_operator_transfer() {
    let mut f = upgraded();
    f.fund_native(&alice(), 10);
    f.proxy.deposit_native(alice(), 10).unwrap();

    let err = f.proxy.transfer_native(alice(), alice(), bob(), 5).unwrap_err();
    assert_eq!(err.kind(), "Unauthorized");
    assert_eq!(f.balance(&alice(), &AssetId::Native), 10);
}

#[test]
fn token_ledger_transfer() {
    let mut f = upgraded();
    let token = f.issue_token("TKN");
    let t = AssetId::Token(token.address());
    token.mint(issuer(), alice(), 80).unwrap();
    token.approve(alice(), bank_address(), 80).unwrap();
    f.proxy.deposit_token(alice(), token.address(), 80).unwrap();

    f.proxy
        .transfer_token(admin(), alice(), bob(), token.address(), 30)
        .unwrap();
    assert_eq!(f.balance(&alice(), &t), 50);
    assert_eq!(f.balance(&bob(), &t), 30);

    f.proxy.withdraw_token(bob(), token.address(), 30).unwrap();
    assert_eq!(token.balance_of(&bob()).unwrap(), 30);
    f.assert_solvent(&t);
}

// ---------------------------------------------------------------------------
// External transfers
// ---------------------------------------------------------------------------

#[test]
fn native_external_transfer_pays_out() {
    let mut f = upgraded();
    f.fund_native(&alice(), 100);
    f.proxy.deposit_native(alice(), 100).unwrap();

    let receipt = f
        .proxy
        .transfer_native_external(admin(), alice(), carol(), 60)
        .unwrap();
    assert!(matches!(
        receipt.events[0],
        BankEvent::LedgerTransfer { external: true, amount: 60, .. }
    ));
    assert_eq!(f.native_held(&carol()), 60);
    assert_eq!(f.balance(&carol(), &AssetId::Native), 0);
    assert_eq!(f.balance(&alice(), &AssetId::Native), 40);
    assert_eq!(f.native_held(&bank_address()), 40);
    f.assert_solvent(&AssetId::Native);
}

#[test]
fn token_external_transfer_pays_out() {
    let mut f = upgraded();
    let token = f.issue_token("TKN");
    token.mint(issuer(), alice(), 20).unwrap();
    token.approve(alice(), bank_address(), 20).unwrap();
    f.proxy.deposit_token(alice(), token.address(), 20).unwrap();

    f.proxy
        .transfer_token_external(owner(), alice(), carol(), token.address(), 20)
        .unwrap();
    assert_eq!(token.balance_of(&carol()).unwrap(), 20);
    assert_eq!(token.balance_of(&bank_address()).unwrap(), 0);
    assert!(f.proxy.view().entries().unwrap().is_empty());
}

struct Refuse;

impl ReceiveHook for Refuse {
    fn on_receive(&self, _from: Address, _amount: u64) -> Result<(), String> {
        Err("rejected".into())
    }
}

#[test]
fn rejected_external_transfer_restores_debit() {
    let mut f = upgraded();
    f.fund_native(&alice(), 100);
    f.proxy.deposit_native(alice(), 100).unwrap();
    f.coin.set_receive_hook(carol(), Arc::new(Refuse));

    let err = f
        .proxy
        .transfer_native_external(admin(), alice(), carol(), 60)
        .unwrap_err();
    assert_eq!(err.kind(), "TransferFailed");
    assert_eq!(f.balance(&alice(), &AssetId::Native), 100);
    assert_eq!(f.native_held(&bank_address()), 100);
}

// ---------------------------------------------------------------------------
// Signed transfers
// ---------------------------------------------------------------------------

fn signer() -> Keypair {
    Keypair::from_seed(&[42u8; 32])
}

fn funded_signer(f: &mut Fixture, amount: u64) -> Address {
    let account = signer().address();
    f.fund_native(&account, amount);
    f.proxy.deposit_native(account, amount).unwrap();
    account
}

fn intent(from: Address, amount: u64, nonce: u64) -> TransferIntent {
    TransferIntent {
        from,
        to: bob(),
        asset: AssetId::Native,
        amount,
        external: false,
        nonce,
    }
}

#[test]
fn signed_transfer_moves_funds_and_bumps_nonce() {
    let mut f = upgraded();
    let account = funded_signer(&mut f, 100);

    let auth = intent(account, 30, 0).sign(&bank_address(), &signer());
    f.proxy.transfer_signed(carol(), &auth).unwrap();

    assert_eq!(f.balance(&account, &AssetId::Native), 70);
    assert_eq!(f.balance(&bob(), &AssetId::Native), 30);
    assert_eq!(f.proxy.view().nonce_of(&account).unwrap(), 1);
}

#[test]
fn replayed_authorization_fails() {
    let mut f = upgraded();
    let account = funded_signer(&mut f, 100);
    let auth = intent(account, 30, 0).sign(&bank_address(), &signer());
    f.proxy.transfer_signed(carol(), &auth).unwrap();

    let err = f.proxy.transfer_signed(carol(), &auth).unwrap_err();
    assert!(matches!(
        err,
        BankError::InvalidNonce {
            expected: 1,
            got: 0,
            ..
        }
    ));
    assert_eq!(f.balance(&account, &AssetId::Native), 70);
}

#[test]
fn tampered_authorization_fails_and_keeps_nonce() {
    let mut f = upgraded();
    let account = funded_signer(&mut f, 100);
    let mut auth = intent(account, 30, 0).sign(&bank_address(), &signer());
    auth.intent.amount = 100;

    assert_eq!(
        f.proxy.transfer_signed(carol(), &auth).unwrap_err().kind(),
        "InvalidSignature"
    );
    assert_eq!(f.proxy.view().nonce_of(&account).unwrap(), 0);
    assert_eq!(f.balance(&account, &AssetId::Native), 100);
}

#[test]
fn key_not_controlling_from_is_unauthorized() {
    let mut f = upgraded();
    let account = funded_signer(&mut f, 100);
    let thief = Keypair::from_seed(&[9u8; 32]);
    let auth = intent(account, 30, 0).sign(&bank_address(), &thief);

    assert_eq!(
        f.proxy.transfer_signed(thief.address(), &auth).unwrap_err().kind(),
        "Unauthorized"
    );
}

#[test]
fn signed_external_transfer() {
    let mut f = upgraded();
    let account = funded_signer(&mut f, 100);
    let mut external = intent(account, 25, 0);
    external.external = true;
    external.to = carol();
    let auth = external.sign(&bank_address(), &signer());

    f.proxy.transfer_signed(bob(), &auth).unwrap();
    assert_eq!(f.native_held(&carol()), 25);
    assert_eq!(f.balance(&account, &AssetId::Native), 75);
}

#[test]
fn signed_transfer_for_another_bank_rejected() {
    let mut f = upgraded();
    let account = funded_signer(&mut f, 100);
    let auth = intent(account, 30, 0).sign(&Address::from_label("another bank"), &signer());
    assert_eq!(
        f.proxy.transfer_signed(carol(), &auth).unwrap_err().kind(),
        "InvalidSignature"
    );
}

#[test]
fn transfers_to_the_bank_rejected() {
    let mut f = upgraded();
    f.fund_native(&alice(), 100);
    f.proxy.deposit_native(alice(), 100).unwrap();

    let err = f
        .proxy
        .transfer_native_external(admin(), alice(), bank_address(), 100)
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidAddress");
    let err = f
        .proxy
        .transfer_native(admin(), alice(), bank_address(), 100)
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidAddress");

    assert_eq!(f.balance(&alice(), &AssetId::Native), 100);
    assert_eq!(f.balance(&bank_address(), &AssetId::Native), 0);
    assert_eq!(f.native_held(&bank_address()), 100);
    f.assert_solvent(&AssetId::Native);
}

#[test]
fn token_payout_to_the_bank_rejected() {
    let mut f = upgraded();
    let token = f.issue_token("TKN");
    let t = AssetId::Token(token.address());
    token.mint(issuer(), alice(), 20).unwrap();
    token.approve(alice(), bank_address(), 20).unwrap();
    f.proxy.deposit_token(alice(), token.address(), 20).unwrap();

    let err = f
        .proxy
        .transfer_token_external(owner(), alice(), bank_address(), token.address(), 20)
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidAddress");
    assert_eq!(f.balance(&alice(), &t), 20);
    assert_eq!(token.balance_of(&bank_address()).unwrap(), 20);
    f.assert_solvent(&t);
}

#[test]
fn signed_payout_to_the_bank_rejected() {
    let mut f = upgraded();
    let account = funded_signer(&mut f, 50);
    let auth = TransferIntent {
        to: bank_address(),
        external: true,
        ..intent(account, 50, 0)
    }
    .sign(&bank_address(), &signer());

    let err = f.proxy.transfer_signed(carol(), &auth).unwrap_err();
    assert_eq!(err.kind(), "InvalidAddress");
    assert_eq!(f.balance(&account, &AssetId::Native), 50);
    assert_eq!(f.proxy.view().nonce_of(&account).unwrap(), 0);
    f.assert_solvent(&AssetId::Native);
}

// ---------------------------------------------------------------------------
// Pause
// ---------------------------------------------------------------------------

#[test]
fn pause_blocks_every_transfer() {
    let mut f = upgraded();
    let account = funded_signer(&mut f, 100);
    f.proxy.pause(admin()).unwrap();

    let auth = intent(account, 10, 0).sign(&bank_address(), &signer());
    assert_eq!(
        f.proxy.transfer_signed(carol(), &auth).unwrap_err().kind(),
        "SystemPaused"
    );
    assert_eq!(
        f.proxy.transfer_native(admin(), account, bob(), 10).unwrap_err().kind(),
        "SystemPaused"
    );
    assert_eq!(
        f.proxy
            .transfer_native_external(admin(), account, bob(), 10)
            .unwrap_err()
            .kind(),
        "SystemPaused"
    );
    assert_eq!(f.balance(&account, &AssetId::Native), 100);

    f.proxy.unpause(admin()).unwrap();
    f.proxy.transfer_signed(carol(), &auth).unwrap();
}

#[test]
fn pause_blocks_token_transfers() {
    let mut f = upgraded();
    let token = f.issue_token("TKN");
    let t = AssetId::Token(token.address());
    token.mint(issuer(), alice(), 50).unwrap();
    token.approve(alice(), bank_address(), 50).unwrap();
    f.proxy.deposit_token(alice(), token.address(), 50).unwrap();
    f.proxy.pause(admin()).unwrap();

    assert_eq!(
        f.proxy
            .transfer_token(admin(), alice(), bob(), token.address(), 10)
            .unwrap_err()
            .kind(),
        "SystemPaused"
    );
    assert_eq!(
        f.proxy
            .transfer_token_external(admin(), alice(), carol(), token.address(), 10)
            .unwrap_err()
            .kind(),
        "SystemPaused"
    );
    assert_eq!(f.balance(&alice(), &t), 50);
    assert_eq!(f.balance(&bob(), &t), 0);
    assert_eq!(token.balance_of(&bank_address()).unwrap(), 50);
    assert_eq!(token.balance_of(&carol()).unwrap(), 0);

    f.proxy.unpause(admin()).unwrap();
    f.proxy
        .transfer_token(admin(), alice(), bob(), token.address(), 10)
        .unwrap();
    f.proxy
        .transfer_token_external(admin(), alice(), carol(), token.address(), 10)
        .unwrap();
    assert_eq!(f.balance(&alice(), &t), 30);
    assert_eq!(f.balance(&bob(), &t), 10);
    assert_eq!(token.balance_of(&carol()).unwrap(), 10);
    f.assert_solvent(&t);
}
