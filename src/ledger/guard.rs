//! Authorization Guard
//!
//! One place decides whether a caller holds a role. Operations call
//! `authorize` before touching any state.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::ids::{AccountId, HuntId};
use crate::ledger::error::{Entity, LedgerError};
use crate::ledger::state::Ledger;

/// Roles an operation can require.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The designated ledger admin.
    Admin,
    /// Creator of a specific hunt.
    HuntCreator(HuntId),
    /// Member of the authorized oracle set.
    Oracle,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::HuntCreator(id) => write!(f, "creator of hunt {}", id),
            Self::Oracle => write!(f, "an authorized oracle"),
        }
    }
}

impl Ledger {
    /// Check that `caller` holds `role`.
    ///
    /// `HuntCreator` on a missing hunt is `NotFound`, not `Unauthorized`.
    pub fn authorize(&self, caller: &AccountId, role: Role) -> Result<(), LedgerError> {
        let allowed = match role {
            Role::Admin => *caller == self.config().admin,
            Role::HuntCreator(hunt_id) => {
                let hunt = self.state.hunts.get(&hunt_id)
                    .ok_or(LedgerError::NotFound(Entity::Hunt(hunt_id)))?;
                hunt.creator == *caller
            }
            Role::Oracle => self.state.oracles.as_ref()
                .is_some_and(|o| o.authorized_oracles.contains(caller)),
        };

        if allowed {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized { caller: *caller, role })
        }
    }
}
