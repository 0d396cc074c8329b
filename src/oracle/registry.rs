//! Oracle Registry
//!
//! Admin-managed set of oracles allowed to answer requests.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::hash::StateHasher;
use crate::core::ids::{AccountId, RequestId};
use crate::ledger::error::{Component, LedgerError};
use crate::ledger::events::EventData;
use crate::ledger::guard::Role;
use crate::ledger::state::Ledger;

/// Authorized oracles and outstanding request ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRegistry {
    /// Admin that initialized the registry.
    pub admin: AccountId,
    /// Oracles allowed to respond and heartbeat.
    pub authorized_oracles: BTreeSet<AccountId>,
    /// Requests ever opened (also the last request id).
    pub request_count: u64,
    /// Requests still awaiting a response.
    pub active_request_ids: BTreeSet<RequestId>,
    /// Unix time of the last heartbeat from any oracle.
    pub last_heartbeat: u64,
}

impl OracleRegistry {
    /// Empty registry.
    pub fn new(admin: AccountId, now: u64) -> Self {
        Self {
            admin,
            authorized_oracles: BTreeSet::new(),
            request_count: 0,
            active_request_ids: BTreeSet::new(),
            last_heartbeat: now,
        }
    }

    /// Id the next request will receive.
    pub fn next_request_id(&self) -> Result<RequestId, LedgerError> {
        self.request_count.checked_add(1).ok_or_else(|| LedgerError::overflow("request_count"))
    }

    /// Is `oracle` in the authorized set?
    pub fn is_authorized(&self, oracle: &AccountId) -> bool {
        self.authorized_oracles.contains(oracle)
    }

    /// Hash this registry for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_account(&self.admin);
        hasher.update_u64(self.authorized_oracles.len() as u64);
        for oracle in &self.authorized_oracles {
            hasher.update_account(oracle);
        }
        hasher.update_u64(self.request_count);
        hasher.update_u64(self.active_request_ids.len() as u64);
        for id in &self.active_request_ids {
            hasher.update_u64(*id);
        }
        hasher.update_u64(self.last_heartbeat);
    }
}

impl Ledger {
    /// Initialize the oracle registry (admin only, once).
    pub fn initialize_oracles(&mut self, caller: AccountId) -> Result<(), LedgerError> {
        if self.state.oracles.is_some() {
            return Err(LedgerError::AlreadyInitialized(Component::OracleRegistry));
        }
        self.authorize(&caller, Role::Admin)?;

        self.state.oracles = Some(OracleRegistry::new(caller, self.now()));

        info!(admin = %caller.short(), "Oracle registry initialized");
        self.push_event(caller, EventData::OracleRegistryInitialized { admin: caller });
        Ok(())
    }

    /// Add an oracle to the authorized set.
    ///
    /// Idempotent: returns `false` and emits nothing if already present.
    pub fn authorize_oracle(&mut self, caller: AccountId, oracle: AccountId) -> Result<bool, LedgerError> {
        self.oracle_registry()?;
        self.authorize(&caller, Role::Admin)?;

        let inserted = self.oracle_registry_mut()?.authorized_oracles.insert(oracle);
        if inserted {
            info!(oracle = %oracle.short(), "Oracle authorized");
            self.push_event(caller, EventData::OracleAuthorized { oracle });
        }
        Ok(inserted)
    }

    /// Remove an oracle from the authorized set.
    ///
    /// Returns `false` if it was not a member.
    pub fn revoke_oracle(&mut self, caller: AccountId, oracle: AccountId) -> Result<bool, LedgerError> {
        self.oracle_registry()?;
        self.authorize(&caller, Role::Admin)?;

        let removed = self.oracle_registry_mut()?.authorized_oracles.remove(&oracle);
        if removed {
            info!(oracle = %oracle.short(), "Oracle revoked");
            self.push_event(caller, EventData::OracleRevoked { oracle });
        }
        Ok(removed)
    }

    /// Record a liveness ping. Only `last_heartbeat` changes.
    pub fn heartbeat(&mut self, oracle: AccountId) -> Result<(), LedgerError> {
        self.oracle_registry()?;
        self.authorize(&oracle, Role::Oracle)?;

        let now = self.now();
        self.oracle_registry_mut()?.last_heartbeat = now;

        debug!(oracle = %oracle.short(), now, "Oracle heartbeat");
        self.push_event(oracle, EventData::OracleHeartbeat { oracle });
        Ok(())
    }

    /// Oracle registry, or `NotInitialized`.
    pub fn oracle_registry(&self) -> Result<&OracleRegistry, LedgerError> {
        self.state.oracles.as_ref()
            .ok_or(LedgerError::NotInitialized(Component::OracleRegistry))
    }

    pub(crate) fn oracle_registry_mut(&mut self) -> Result<&mut OracleRegistry, LedgerError> {
        self.state.oracles.as_mut()
            .ok_or(LedgerError::NotInitialized(Component::OracleRegistry))
    }
}
