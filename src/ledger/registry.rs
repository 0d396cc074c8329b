//! Global Registry
//!
//! Process-wide counters. Ids are handed out here and nowhere else, so
//! they are strictly increasing and never reused.

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::hash::StateHasher;
use crate::core::ids::{AccountId, HuntId, TreasureId};
use crate::ledger::error::{Component, LedgerError};
use crate::ledger::events::EventData;
use crate::ledger::guard::Role;
use crate::ledger::state::Ledger;

/// Fee rate set at initialization (percent).
pub const DEFAULT_FEE_PERCENTAGE: u8 = 5;

/// Global counters and settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRegistry {
    /// Admin that initialized the ledger.
    pub admin: AccountId,
    /// Number of hunts ever created (also the last hunt id).
    pub hunt_count: u64,
    /// Number of treasures ever added (also the last treasure id).
    pub treasure_count: u64,
    /// Number of registered players.
    pub total_players: u64,
    /// Sum of rewards credited by claims.
    pub total_rewards_distributed: u64,
    /// Platform fee (percent).
    pub fee_percentage: u8,
    /// Unix time of initialization.
    pub initialized_at: u64,
}

impl GlobalRegistry {
    /// Fresh registry: all counters zero, default fee.
    pub fn new(admin: AccountId, now: u64) -> Self {
        Self {
            admin,
            hunt_count: 0,
            treasure_count: 0,
            total_players: 0,
            total_rewards_distributed: 0,
            fee_percentage: DEFAULT_FEE_PERCENTAGE,
            initialized_at: now,
        }
    }

    /// Id the next hunt will receive.
    pub fn next_hunt_id(&self) -> Result<HuntId, LedgerError> {
        self.hunt_count.checked_add(1).ok_or_else(|| LedgerError::overflow("hunt_count"))
    }

    /// Id the next treasure will receive.
    pub fn next_treasure_id(&self) -> Result<TreasureId, LedgerError> {
        self.treasure_count.checked_add(1).ok_or_else(|| LedgerError::overflow("treasure_count"))
    }

    /// Fee owed on `amount` at the current rate (rounded down).
    pub fn fee_for(&self, amount: u64) -> u64 {
        ((amount as u128 * self.fee_percentage as u128) / 100) as u64
    }

    /// Hash this registry for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_account(&self.admin);
        hasher.update_u64(self.hunt_count);
        hasher.update_u64(self.treasure_count);
        hasher.update_u64(self.total_players);
        hasher.update_u64(self.total_rewards_distributed);
        hasher.update_u8(self.fee_percentage);
        hasher.update_u64(self.initialized_at);
    }
}

impl Ledger {
    /// Initialize the global registry.
    ///
    /// Fails `AlreadyInitialized` on a second call and `Unauthorized` if
    /// `caller` is not the configured admin.
    pub fn initialize(&mut self, caller: AccountId) -> Result<(), LedgerError> {
        if self.state.registry.is_some() {
            return Err(LedgerError::AlreadyInitialized(Component::Registry));
        }
        self.authorize(&caller, Role::Admin)?;

        let registry = GlobalRegistry::new(caller, self.now());
        let fee_percentage = registry.fee_percentage;
        self.state.registry = Some(registry);

        info!(admin = %caller.short(), fee_percentage, "Global registry initialized");
        self.push_event(caller, EventData::RegistryInitialized { admin: caller, fee_percentage });
        Ok(())
    }

    /// Change the fee rate (admin only, at most 100).
    pub fn set_fee_percentage(&mut self, caller: AccountId, percentage: u8) -> Result<(), LedgerError> {
        self.registry()?;
        self.authorize(&caller, Role::Admin)?;
        if percentage > 100 {
            return Err(LedgerError::InvalidArgument(format!(
                "fee percentage {} exceeds 100", percentage
            )));
        }

        let registry = self.registry_mut()?;
        let old_percentage = registry.fee_percentage;
        registry.fee_percentage = percentage;

        self.push_event(caller, EventData::FeeUpdated { old_percentage, new_percentage: percentage });
        Ok(())
    }
}
