//! Reward Pools
//!
//! Per-owner fund accounting. Invariant: `distributed_funds <= total_funds`.
//! Pending rewards form a FIFO queue; each entry is consumed at most once.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::hash::StateHasher;
use crate::core::ids::{AccountId, TreasureId};
use crate::ledger::error::{Entity, LedgerError};
use crate::ledger::events::EventData;
use crate::ledger::state::Ledger;

/// A reserved-but-unpaid reward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReward {
    /// Player the reward is reserved for.
    pub player: AccountId,
    /// Amount to pay.
    pub amount: u64,
    /// Treasure the reward pays for.
    pub treasure_id: TreasureId,
    /// Unix time of the reservation.
    pub created_at: u64,
}

/// Fund accounting for one owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPool {
    /// Owner of the pool.
    pub owner: AccountId,
    /// Funds deposited so far.
    pub total_funds: u64,
    /// Funds paid out so far.
    pub distributed_funds: u64,
    /// Pending rewards in insertion order.
    pub pending_rewards: Vec<PendingReward>,
}

impl RewardPool {
    /// New pool holding `initial_funds`.
    pub fn new(owner: AccountId, initial_funds: u64) -> Self {
        Self {
            owner,
            total_funds: initial_funds,
            distributed_funds: 0,
            pending_rewards: Vec::new(),
        }
    }

    /// Funds not yet distributed.
    pub fn available(&self) -> u64 {
        self.total_funds - self.distributed_funds
    }

    /// Sum of queued pending rewards.
    pub fn pending_total(&self) -> u64 {
        self.pending_rewards.iter().map(|r| r.amount).fold(0u64, u64::saturating_add)
    }

    /// Fails unless paying `amount` on top of what was distributed keeps
    /// `distributed_funds <= total_funds`.
    pub fn ensure_can_pay(&self, amount: u64) -> Result<(), LedgerError> {
        match self.distributed_funds.checked_add(amount) {
            Some(needed) if needed <= self.total_funds => Ok(()),
            _ => Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.available(),
            }),
        }
    }

    /// Position of the earliest pending reward for `(player, treasure_id)`.
    pub fn find_pending(&self, player: &AccountId, treasure_id: TreasureId) -> Option<usize> {
        self.pending_rewards.iter()
            .position(|r| r.player == *player && r.treasure_id == treasure_id)
    }

    /// Hash this pool's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_account(&self.owner);
        hasher.update_u64(self.total_funds);
        hasher.update_u64(self.distributed_funds);
        hasher.update_u64(self.pending_rewards.len() as u64);
        for reward in &self.pending_rewards {
            hasher.update_account(&reward.player);
            hasher.update_u64(reward.amount);
            hasher.update_u64(reward.treasure_id);
            hasher.update_u64(reward.created_at);
        }
    }
}

impl Ledger {
    /// Open a reward pool for `owner`.
    pub fn initialize_pool(&mut self, owner: AccountId, initial_funds: u64) -> Result<(), LedgerError> {
        if self.state.pools.contains_key(&owner) {
            return Err(LedgerError::AlreadyExists(Entity::Pool(owner)));
        }

        self.state.pools.insert(owner, RewardPool::new(owner, initial_funds));

        info!(owner = %owner.short(), initial_funds, "Reward pool initialized");
        self.push_event(owner, EventData::PoolInitialized { owner, initial_funds });
        Ok(())
    }

    /// Deposit more funds into the caller's pool.
    pub fn add_funds(&mut self, owner: AccountId, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidArgument("deposit must be positive".into()));
        }
        let pool = self.pool_mut(&owner)?;
        let total_funds = pool.total_funds.checked_add(amount)
            .ok_or_else(|| LedgerError::overflow("total_funds"))?;
        pool.total_funds = total_funds;

        debug!(owner = %owner.short(), amount, total_funds, "Funds added");
        self.push_event(owner, EventData::FundsAdded { owner, amount, total_funds });
        Ok(total_funds)
    }

    /// Reserve `amount` for `player` against `treasure_id`.
    pub fn create_pending_reward(
        &mut self,
        owner: AccountId,
        player: AccountId,
        amount: u64,
        treasure_id: TreasureId,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidArgument("reward must be positive".into()));
        }
        let now = self.now();
        let pool = self.pool_mut(&owner)?;
        pool.ensure_can_pay(amount)?;
        pool.pending_rewards.push(PendingReward {
            player,
            amount,
            treasure_id,
            created_at: now,
        });

        debug!(owner = %owner.short(), player = %player.short(), treasure_id, amount, "Pending reward created");
        self.push_event(owner, EventData::PendingRewardCreated { owner, player, treasure_id, amount });
        Ok(())
    }

    /// Pay the earliest pending reward matching `(player, treasure_id)`.
    ///
    /// Returns the amount paid. The entry is removed, so a second call
    /// for the same pair fails `NotFound` (unless another entry exists).
    pub fn distribute_reward(
        &mut self,
        owner: AccountId,
        player: AccountId,
        treasure_id: TreasureId,
    ) -> Result<u64, LedgerError> {
        let pool = self.pool_mut(&owner)?;
        let index = pool.find_pending(&player, treasure_id)
            .ok_or(LedgerError::NotFound(Entity::PendingReward { player, treasure_id }))?;
        let amount = pool.pending_rewards[index].amount;
        pool.ensure_can_pay(amount)?;

        pool.pending_rewards.remove(index);
        pool.distributed_funds += amount;
        let distributed_funds = pool.distributed_funds;

        info!(owner = %owner.short(), player = %player.short(), treasure_id, amount, "Reward distributed");
        self.push_event(owner, EventData::RewardDistributed {
            owner,
            player,
            treasure_id,
            amount,
            distributed_funds,
        });
        Ok(amount)
    }

    /// Get an owner's pool.
    pub fn pool(&self, owner: &AccountId) -> Result<&RewardPool, LedgerError> {
        self.state.pools.get(owner)
            .ok_or(LedgerError::NotFound(Entity::Pool(*owner)))
    }

    fn pool_mut(&mut self, owner: &AccountId) -> Result<&mut RewardPool, LedgerError> {
        self.state.pools.get_mut(owner)
            .ok_or(LedgerError::NotFound(Entity::Pool(*owner)))
    }

    /// Pending rewards of an owner's pool in insertion order.
    pub fn pending_rewards(&self, owner: &AccountId) -> Result<&[PendingReward], LedgerError> {
        Ok(&self.pool(owner)?.pending_rewards)
    }
}
