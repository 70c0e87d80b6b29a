//! # Bank Logic V2: Transfers
//!
//! The second revision keeps every V1 entry point and adds transfers over
//! the same ledger:
//!
//! | Entry point                   | Effect                                  |
//! |-------------------------------|-----------------------------------------|
//! | `transfer_native` / `_token`  | debit `from`, credit `to` in the ledger |
//! | `transfer_*_external`         | debit `from`, send value out to `to`    |
//! | `transfer_signed`             | either of the above, authorized by the account's own key |
//!
//! Operator transfers require the admin or the owner. A signed transfer
//! needs no role: the `from` key's signature over the intent and the
//! account's next nonce are the authority.

use vaultbank_protocol::access::Role;
use vaultbank_protocol::authorization::{self, TransferAuthorization};
use vaultbank_protocol::ledger;
use vaultbank_protocol::pause::Gate;
use vaultbank_protocol::{Address, AssetId, BankError, BankEvent, BankResult};

use crate::call::Call;

fn ensure_recipient(call: &Call<'_>, to: &Address) -> BankResult<()> {
    if to.is_zero() {
        return Err(BankError::InvalidAddress(
            "transfer recipient cannot be the zero address".into(),
        ));
    }
    call.ensure_not_bank(to)
}

/// Pause, role and amount checks shared by the operator transfers.
fn operator_checks(call: &Call<'_>, amount: u64) -> BankResult<()> {
    call.ensure_open(Gate::Transfer)?;
    call.require(Role::AdminOrOwner)?;
    if amount == 0 {
        return Err(BankError::ZeroAmount);
    }
    Ok(())
}

fn move_in_ledger(
    call: &mut Call<'_>,
    from: Address,
    to: Address,
    asset: AssetId,
    amount: u64,
) -> BankResult<()> {
    ensure_recipient(call, &to)?;
    ledger::move_balance(&mut call.state, &from, &to, &asset, amount)?;
    call.emit(BankEvent::LedgerTransfer {
        from,
        to,
        asset,
        amount,
        external: false,
    });
    Ok(())
}

fn send_out(
    call: &mut Call<'_>,
    from: Address,
    to: Address,
    asset: AssetId,
    amount: u64,
) -> BankResult<()> {
    ensure_recipient(call, &to)?;
    ledger::debit(&mut call.state, &from, &asset, amount)?;
    call.state.flush()?;
    call.send(&asset, &to, amount)?;
    call.emit(BankEvent::LedgerTransfer {
        from,
        to,
        asset,
        amount,
        external: true,
    });
    Ok(())
}

pub fn transfer_native(call: &mut Call<'_>, from: Address, to: Address, amount: u64) -> BankResult<()> {
    operator_checks(call, amount)?;
    move_in_ledger(call, from, to, AssetId::Native, amount)
}

pub fn transfer_token(
    call: &mut Call<'_>,
    from: Address,
    to: Address,
    token: Address,
    amount: u64,
) -> BankResult<()> {
    operator_checks(call, amount)?;
    let asset = Call::token_asset(&token)?;
    move_in_ledger(call, from, to, asset, amount)
}

pub fn transfer_native_external(
    call: &mut Call<'_>,
    from: Address,
    to: Address,
    amount: u64,
) -> BankResult<()> {
    operator_checks(call, amount)?;
    send_out(call, from, to, AssetId::Native, amount)
}

pub fn transfer_token_external(
    call: &mut Call<'_>,
    from: Address,
    to: Address,
    token: Address,
    amount: u64,
) -> BankResult<()> {
    operator_checks(call, amount)?;
    let asset = Call::token_asset(&token)?;
    send_out(call, from, to, asset, amount)
}

/// Executes a transfer the `from` account signed itself.
pub fn transfer_signed(call: &mut Call<'_>, auth: &TransferAuthorization) -> BankResult<()> {
    call.ensure_open(Gate::Transfer)?;
    let intent = &auth.intent;
    if intent.amount == 0 {
        return Err(BankError::ZeroAmount);
    }
    auth.check_signer()?;
    authorization::consume_nonce(&mut call.state, &intent.from, intent.nonce)?;
    auth.check_signature(&call.bank())?;

    if intent.external {
        send_out(call, intent.from, intent.to, intent.asset, intent.amount)
    } else {
        move_in_ledger(call, intent.from, intent.to, intent.asset, intent.amount)
    }
}
