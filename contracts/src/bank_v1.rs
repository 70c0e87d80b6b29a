//! # Bank Logic V1: Deposit & Withdraw
//!
//! The first logic revision: value in, value out, plus the administrative
//! surface (pause, role changes).
//!
//! ## Ordering
//!
//! ```text
//! deposit:   pause ─► amount ─► caller ─► stage credit ─► pull value into custody
//! withdraw:  pause ─► amount ─► caller ─► debit ─► flush ─► send value out
//! ```
//!
//! A withdrawal's debit is flushed before any value leaves custody, so a
//! reentrant reader already sees the reduced balance. If the send fails the
//! proxy reverts the flush and the call fails as a whole.

use vaultbank_protocol::access::{self, Role};
use vaultbank_protocol::ledger;
use vaultbank_protocol::pause::{self, Gate};
use vaultbank_protocol::{Address, AssetId, BankError, BankEvent, BankResult};

use crate::call::Call;

fn ensure_positive(amount: u64) -> BankResult<()> {
    if amount == 0 {
        Err(BankError::ZeroAmount)
    } else {
        Ok(())
    }
}

fn deposit(call: &mut Call<'_>, asset: AssetId, amount: u64) -> BankResult<()> {
    call.ensure_open(Gate::Deposit)?;
    ensure_positive(amount)?;

    let account = call.caller();
    call.ensure_not_bank(&account)?;
    ledger::credit(&mut call.state, &account, &asset, amount)?;
    call.pull(&asset, &account, amount)?;

    call.emit(BankEvent::Deposit {
        account,
        asset,
        amount,
    });
    Ok(())
}

fn withdraw(call: &mut Call<'_>, asset: AssetId, amount: u64) -> BankResult<()> {
    call.ensure_open(Gate::Withdraw)?;
    ensure_positive(amount)?;

    let account = call.caller();
    call.ensure_not_bank(&account)?;
    ledger::debit(&mut call.state, &account, &asset, amount)?;
    call.state.flush()?;
    call.send(&asset, &account, amount)?;

    call.emit(BankEvent::Withdraw {
        account,
        asset,
        amount,
    });
    Ok(())
}

/// Credits the caller with exactly the value attached to the call.
pub fn deposit_native(call: &mut Call<'_>, value: u64) -> BankResult<()> {
    deposit(call, AssetId::Native, value)
}

/// Pulls `amount` of `token` from the caller via `transfer_from`. The caller
/// must have approved the bank beforehand.
pub fn deposit_token(call: &mut Call<'_>, token: Address, amount: u64) -> BankResult<()> {
    let asset = Call::token_asset(&token)?;
    deposit(call, asset, amount)
}

pub fn withdraw_native(call: &mut Call<'_>, amount: u64) -> BankResult<()> {
    withdraw(call, AssetId::Native, amount)
}

pub fn withdraw_token(call: &mut Call<'_>, token: Address, amount: u64) -> BankResult<()> {
    let asset = Call::token_asset(&token)?;
    withdraw(call, asset, amount)
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

pub fn pause(call: &mut Call<'_>) -> BankResult<()> {
    call.require(Role::Admin)?;
    let next = pause::load(&call.state)?.pause()?;
    pause::store(&mut call.state, next)?;
    let by = call.caller();
    call.emit(BankEvent::Paused { by });
    Ok(())
}

pub fn unpause(call: &mut Call<'_>) -> BankResult<()> {
    call.require(Role::Admin)?;
    let next = pause::load(&call.state)?.unpause()?;
    pause::store(&mut call.state, next)?;
    let by = call.caller();
    call.emit(BankEvent::Unpaused { by });
    Ok(())
}

/// Replaces the admin. The current admin or the owner may do this.
pub fn update_admin(call: &mut Call<'_>, new_admin: Address) -> BankResult<()> {
    let roles = call.require(Role::AdminOrOwner)?;
    let updated = roles.with_admin(new_admin)?;
    access::store_roles(&mut call.state, &updated)?;
    call.emit(BankEvent::AdminChanged {
        previous: roles.admin,
        admin: updated.admin,
    });
    Ok(())
}

/// Hands upgrade authority to `new_owner`. Owner only.
pub fn transfer_ownership(call: &mut Call<'_>, new_owner: Address) -> BankResult<()> {
    let roles = call.require(Role::Owner)?;
    let updated = roles.with_owner(new_owner)?;
    access::store_roles(&mut call.state, &updated)?;
    call.emit(BankEvent::OwnershipTransferred {
        previous: roles.owner,
        owner: updated.owner,
    });
    Ok(())
}
