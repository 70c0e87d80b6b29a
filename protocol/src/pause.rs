//! # Pause Controller
//!
//! A binary circuit breaker. While [`PauseState::Paused`], mutating entry
//! points fail with [`PauseError::SystemPaused`]; balance queries never
//! consult the flag.
//!
//! Which entry points a pause blocks depends on the deployment's
//! [`PausePolicy`]: under `Strict` all of them, under `AllowWithdrawals`
//! everything except withdrawals.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PausePolicy;
use crate::storage::keys;
use crate::storage::{StateTx, StateView, StoreResult};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PauseError {
    #[error("system is paused")]
    SystemPaused,

    #[error("system is already paused")]
    AlreadyPaused,

    #[error("system is already active")]
    AlreadyActive,
}

/// The pause flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseState {
    #[default]
    Active,
    Paused,
}

/// The class of entry point asking to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Deposit,
    Withdraw,
    Transfer,
}

impl PauseState {
    pub fn is_paused(&self) -> bool {
        matches!(self, PauseState::Paused)
    }

    /// Active → Paused.
    pub fn pause(self) -> Result<PauseState, PauseError> {
        match self {
            PauseState::Active => Ok(PauseState::Paused),
            PauseState::Paused => Err(PauseError::AlreadyPaused),
        }
    }

    /// Paused → Active.
    pub fn unpause(self) -> Result<PauseState, PauseError> {
        match self {
            PauseState::Paused => Ok(PauseState::Active),
            PauseState::Active => Err(PauseError::AlreadyActive),
        }
    }

    /// Fails with `SystemPaused` when `gate` is blocked under `policy`.
    pub fn ensure_open(&self, gate: Gate, policy: PausePolicy) -> Result<(), PauseError> {
        if !self.is_paused() {
            return Ok(());
        }
        match (policy, gate) {
            (PausePolicy::AllowWithdrawals, Gate::Withdraw) => Ok(()),
            _ => Err(PauseError::SystemPaused),
        }
    }
}

/// Loads the flag. An unset flag reads as `Active`.
pub fn load(view: &impl StateView) -> StoreResult<PauseState> {
    Ok(view.load(&keys::pause_flag())?.unwrap_or_default())
}

pub fn store(tx: &mut StateTx<'_>, state: PauseState) -> StoreResult<()> {
    tx.save(keys::pause_flag(), &state)
}
