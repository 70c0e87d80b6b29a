//! # Access Control
//!
//! Two singleton roles guard every privileged entry point:
//!
//! - **owner**: upgrade and ownership authority. The deployer.
//! - **admin**: operational authority: pause, unpause, operator transfers.
//!
//! | Operation                          | Required          |
//! |------------------------------------|-------------------|
//! | `pause`, `unpause`                 | [`Role::Admin`]   |
//! | `update_admin`, operator transfers | [`Role::AdminOrOwner`] |
//! | `transfer_ownership`, `upgrade_to` | [`Role::Owner`]   |
//!
//! Entry points call [`Roles::authorize`] before touching anything else.
//! Role changes go through [`Roles::with_admin`] / [`Roles::with_owner`],
//! which refuse the zero address.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::address::Address;
use crate::storage::keys;
use crate::storage::{StateTx, StateView, StoreResult};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The caller does not hold the role the operation requires.
    #[error("access denied: {caller} is not {required}")]
    Unauthorized { caller: Address, required: Role },

    /// A signed request was made with a key that does not control the account.
    #[error("access denied: signer {signer} does not control {account}")]
    NotAccountHolder { account: Address, signer: Address },

    /// The zero address cannot hold a role.
    #[error("zero address cannot be {0}")]
    ZeroAddress(Role),
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// A capability an entry point can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    AdminOrOwner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Admin => write!(f, "admin"),
            Role::AdminOrOwner => write!(f, "admin or owner"),
        }
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The persisted owner/admin pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub owner: Address,
    pub admin: Address,
}

impl Roles {
    pub fn new(owner: Address, admin: Address) -> Result<Self, AccessError> {
        if owner.is_zero() {
            return Err(AccessError::ZeroAddress(Role::Owner));
        }
        if admin.is_zero() {
            return Err(AccessError::ZeroAddress(Role::Admin));
        }
        Ok(Self { owner, admin })
    }

    pub fn has_role(&self, caller: &Address, role: Role) -> bool {
        match role {
            Role::Owner => *caller == self.owner,
            Role::Admin => *caller == self.admin,
            Role::AdminOrOwner => *caller == self.admin || *caller == self.owner,
        }
    }

    /// Fails with [`AccessError::Unauthorized`] unless `caller` holds `role`.
    pub fn authorize(&self, caller: &Address, role: Role) -> Result<(), AccessError> {
        if self.has_role(caller, role) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized {
                caller: *caller,
                required: role,
            })
        }
    }

    /// A copy with the admin replaced.
    pub fn with_admin(&self, admin: Address) -> Result<Self, AccessError> {
        if admin.is_zero() {
            return Err(AccessError::ZeroAddress(Role::Admin));
        }
        Ok(Self { admin, ..*self })
    }

    /// A copy with the owner replaced.
    pub fn with_owner(&self, owner: Address) -> Result<Self, AccessError> {
        if owner.is_zero() {
            return Err(AccessError::ZeroAddress(Role::Owner));
        }
        Ok(Self { owner, ..*self })
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Loads the roles record. `None` means the storage was never initialized.
pub fn load_roles(view: &impl StateView) -> StoreResult<Option<Roles>> {
    let owner: Option<Address> = view.load(&keys::owner())?;
    let admin: Option<Address> = view.load(&keys::admin())?;
    Ok(match (owner, admin) {
        (Some(owner), Some(admin)) => Some(Roles { owner, admin }),
        _ => None,
    })
}

pub fn store_roles(tx: &mut StateTx<'_>, roles: &Roles) -> StoreResult<()> {
    tx.save(keys::owner(), &roles.owner)?;
    tx.save(keys::admin(), &roles.admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Snapshot};

    fn roles() -> Roles {
        Roles::new(Address::from_label("owner"), Address::from_label("admin")).unwrap()
    }

    #[test]
    fn authorization_table() {
        let r = roles();
        let stranger = Address::from_label("stranger");

        assert!(r.authorize(&r.admin, Role::Admin).is_ok());
        assert!(r.authorize(&r.owner, Role::Admin).is_err());
        assert!(r.authorize(&r.owner, Role::Owner).is_ok());
        assert!(r.authorize(&r.admin, Role::Owner).is_err());
        assert!(r.authorize(&r.owner, Role::AdminOrOwner).is_ok());
        assert!(r.authorize(&r.admin, Role::AdminOrOwner).is_ok());
        assert_eq!(
            r.authorize(&stranger, Role::AdminOrOwner),
            Err(AccessError::Unauthorized {
                caller: stranger,
                required: Role::AdminOrOwner,
            })
        );
    }

    #[test]
    fn zero_address_rejected() {
        let r = roles();
        assert_eq!(
            r.with_admin(Address::ZERO),
            Err(AccessError::ZeroAddress(Role::Admin))
        );
        assert_eq!(
            r.with_owner(Address::ZERO),
            Err(AccessError::ZeroAddress(Role::Owner))
        );
        assert!(Roles::new(Address::ZERO, r.admin).is_err());
    }

    #[test]
    fn with_admin_keeps_owner() {
        let r = roles();
        let next = Address::from_label("next");
        let updated = r.with_admin(next).unwrap();
        assert_eq!(updated.admin, next);
        assert_eq!(updated.owner, r.owner);
    }

    #[test]
    fn persisted_roles_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(load_roles(&Snapshot::new(&store)).unwrap(), None);

        let mut tx = StateTx::new(&store);
        store_roles(&mut tx, &roles()).unwrap();
        tx.commit().unwrap();

        assert_eq!(load_roles(&Snapshot::new(&store)).unwrap(), Some(roles()));
    }
}
