//! # Shared Bank Handle
//!
//! [`SharedBank`] is how more than one caller reaches a proxy: HTTP
//! handlers, token contracts, receive hooks.
//!
//! - Calls from different threads serialize on a re-entrant mutex, so
//!   entry points never interleave.
//! - A call arriving on a thread that is already inside an entry point (a
//!   token or receive hook calling back into the bank) finds the proxy
//!   borrowed and fails with [`BankError::Reentrancy`]. Nothing it would
//!   have done happens; the outer call carries on.
//! - Queries go to committed storage directly and never take the lock, so
//!   a hook can still read balances mid-call and sees any debit the outer
//!   call has already flushed.

use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::warn;

use vaultbank_protocol::storage::Store;
use vaultbank_protocol::vault::Custody;
use vaultbank_protocol::{Address, BankError, BankResult};

use crate::proxy::BankProxy;
use crate::view::BankView;

pub struct SharedBank {
    proxy: ReentrantMutex<RefCell<BankProxy>>,
    store: Arc<dyn Store>,
    custody: Custody,
    address: Address,
}

impl SharedBank {
    pub fn new(proxy: BankProxy) -> Self {
        Self {
            store: proxy.store(),
            custody: proxy.custody().clone(),
            address: proxy.address(),
            proxy: ReentrantMutex::new(RefCell::new(proxy)),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Runs a mutating call against the proxy.
    pub fn call<R>(&self, f: impl FnOnce(&mut BankProxy) -> BankResult<R>) -> BankResult<R> {
        let guard = self.proxy.lock();
        let mut proxy = match guard.try_borrow_mut() {
            Ok(proxy) => proxy,
            Err(_) => {
                warn!(bank = %self.address, "reentrant call rejected");
                return Err(BankError::Reentrancy);
            }
        };
        f(&mut proxy)
    }

    /// Lock-free queries over committed state.
    pub fn view(&self) -> BankView<'_> {
        BankView::new(self.store.as_ref(), &self.custody)
    }

    pub fn custody(&self) -> &Custody {
        &self.custody
    }
}
