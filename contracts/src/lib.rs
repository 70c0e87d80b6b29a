//! # VaultBank Contracts
//!
//! The bank's logic revisions and the proxy that fronts them:
//!
//! - **bank_v1**: deposit and withdraw for native coin and tokens, pause,
//!   role administration.
//! - **bank_v2**: everything in V1 plus ledger-internal, external and
//!   signature-authorized transfers.
//! - **proxy**: deployment, per-call atomicity, dispatch by logic version,
//!   and the owner-gated upgrade.
//! - **shared**: the serialized, reentrancy-rejecting handle callers use.
//!
//! ## Design Principles
//!
//! 1. Every mutating entry point checks pause, then role, then amount,
//!    before it touches the ledger.
//! 2. Debit before send. A withdrawal's debit is durable before value
//!    leaves custody.
//! 3. A failed call changes nothing.
//! 4. Revisions share storage through stable keys and never migrate it.

pub mod bank_v1;
pub mod bank_v2;
pub mod call;
pub mod meta;
pub mod proxy;
pub mod shared;
pub mod view;

pub use proxy::{BankProxy, Deployment};
pub use shared::SharedBank;
pub use view::{BankView, Solvency};
