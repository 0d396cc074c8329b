//! Hunts and Treasures
//!
//! A hunt owns its treasures; a treasure points back at its hunt by id.
//! Adding a treasure reserves its reward out of the hunt's remaining
//! pool, so at all times
//! `remaining_rewards + Σ reward_amount(treasures) == total_reward_pool`.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::hash::StateHasher;
use crate::core::ids::{AccountId, HuntId, TreasureId};
use crate::ledger::error::{Entity, LedgerError};
use crate::ledger::events::EventData;
use crate::ledger::guard::Role;
use crate::ledger::state::Ledger;
use crate::proof::commitment::LocationCommitment;

/// Easiest treasure difficulty.
pub const MIN_DIFFICULTY: u8 = 1;

/// Hardest treasure difficulty.
pub const MAX_DIFFICULTY: u8 = 5;

// =============================================================================
// TREASURE HUNT
// =============================================================================

/// A funded collection of treasures created by one principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasureHunt {
    /// Hunt id (from the global hunt counter).
    pub id: HuntId,
    /// Principal that created and owns the hunt.
    pub creator: AccountId,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Funds committed when the hunt was created.
    pub total_reward_pool: u64,
    /// Funds not yet reserved by a treasure.
    pub remaining_rewards: u64,
    /// Treasures added so far.
    pub total_treasures: u64,
    /// Treasures claimed so far.
    pub claimed_treasures: u64,
    /// Inactive hunts accept neither treasures nor claims.
    pub is_active: bool,
    /// Treasure ids in insertion order.
    pub treasure_ids: Vec<TreasureId>,
    /// Incremented on every successful claim.
    pub participant_count: u64,
    /// Unix time of creation.
    pub created_at: u64,
}

impl TreasureHunt {
    /// Funds reserved by treasures (claimed or not).
    pub fn allocated_rewards(&self) -> u64 {
        self.total_reward_pool - self.remaining_rewards
    }

    /// Every treasure has been claimed.
    pub fn is_completed(&self) -> bool {
        self.total_treasures > 0 && self.claimed_treasures == self.total_treasures
    }

    /// Hash this hunt's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.id);
        hasher.update_account(&self.creator);
        hasher.update_prefixed(self.title.as_bytes());
        hasher.update_prefixed(self.description.as_bytes());
        hasher.update_u64(self.total_reward_pool);
        hasher.update_u64(self.remaining_rewards);
        hasher.update_u64(self.total_treasures);
        hasher.update_u64(self.claimed_treasures);
        hasher.update_bool(self.is_active);
        hasher.update_u64(self.treasure_ids.len() as u64);
        for id in &self.treasure_ids {
            hasher.update_u64(*id);
        }
        hasher.update_u64(self.participant_count);
        hasher.update_u64(self.created_at);
    }
}

// =============================================================================
// TREASURE
// =============================================================================

/// A claimable unit with a committed secret location and a fixed reward.
///
/// Once `claimed` is set, the claim fields never change again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasure {
    /// Treasure id (from the global treasure counter).
    pub id: TreasureId,
    /// Hunt this treasure belongs to.
    pub hunt_id: HuntId,
    /// Principal that hid it.
    pub creator: AccountId,
    /// Commitment to the secret location (immutable).
    pub location_commitment: LocationCommitment,
    /// Reward credited to the finder.
    pub reward_amount: u64,
    /// Has this treasure been claimed?
    pub claimed: bool,
    /// Who claimed it (if claimed).
    pub claimed_by: Option<AccountId>,
    /// When it was claimed (if claimed).
    pub claimed_at: Option<u64>,
    /// 1 (easy) to 5 (hard).
    pub difficulty_level: u8,
    /// Off-ledger metadata (clue text, image, NFT metadata).
    pub metadata_uri: String,
    /// Unix time it was hidden.
    pub created_at: u64,
}

impl Treasure {
    /// Hash this treasure's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.id);
        hasher.update_u64(self.hunt_id);
        hasher.update_account(&self.creator);
        hasher.update_bytes(self.location_commitment.as_bytes());
        hasher.update_u64(self.reward_amount);
        hasher.update_bool(self.claimed);
        match &self.claimed_by {
            Some(player) => {
                hasher.update_u8(1);
                hasher.update_account(player);
            }
            None => hasher.update_u8(0),
        }
        hasher.update_opt_u64(self.claimed_at);
        hasher.update_u8(self.difficulty_level);
        hasher.update_prefixed(self.metadata_uri.as_bytes());
        hasher.update_u64(self.created_at);
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Ledger {
    /// Open a new active hunt funded with `reward_pool_amount`.
    pub fn create_hunt(
        &mut self,
        creator: AccountId,
        title: impl Into<String>,
        description: impl Into<String>,
        reward_pool_amount: u64,
    ) -> Result<HuntId, LedgerError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("hunt title is empty".into()));
        }
        let hunt_id = self.registry()?.next_hunt_id()?;
        let now = self.now();

        self.registry_mut()?.hunt_count = hunt_id;
        self.state.hunts.insert(hunt_id, TreasureHunt {
            id: hunt_id,
            creator,
            title: title.clone(),
            description: description.into(),
            total_reward_pool: reward_pool_amount,
            remaining_rewards: reward_pool_amount,
            total_treasures: 0,
            claimed_treasures: 0,
            is_active: true,
            treasure_ids: Vec::new(),
            participant_count: 0,
            created_at: now,
        });

        info!(hunt_id, creator = %creator.short(), reward_pool_amount, "Hunt created");
        self.push_event(creator, EventData::HuntCreated {
            hunt_id,
            creator,
            title,
            reward_pool: reward_pool_amount,
        });
        Ok(hunt_id)
    }

    /// Hide a treasure in a hunt, reserving `reward_amount` from its pool.
    pub fn add_treasure(
        &mut self,
        creator: AccountId,
        hunt_id: HuntId,
        location_commitment: LocationCommitment,
        reward_amount: u64,
        metadata_uri: impl Into<String>,
        difficulty_level: u8,
    ) -> Result<TreasureId, LedgerError> {
        let treasure_id = self.registry()?.next_treasure_id()?;
        self.authorize(&creator, Role::HuntCreator(hunt_id))?;

        let hunt = self.hunt(hunt_id)?;
        if !hunt.is_active {
            return Err(LedgerError::HuntInactive(hunt_id));
        }
        if reward_amount == 0 {
            return Err(LedgerError::InvalidArgument("reward amount must be positive".into()));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty_level) {
            return Err(LedgerError::InvalidArgument(format!(
                "difficulty {} outside {}..={}", difficulty_level, MIN_DIFFICULTY, MAX_DIFFICULTY
            )));
        }
        if reward_amount > hunt.remaining_rewards {
            return Err(LedgerError::InsufficientFunds {
                requested: reward_amount,
                available: hunt.remaining_rewards,
            });
        }

        let now = self.now();
        self.registry_mut()?.treasure_count = treasure_id;

        let hunt = self.hunt_mut(hunt_id)?;
        hunt.remaining_rewards -= reward_amount;
        hunt.total_treasures += 1;
        hunt.treasure_ids.push(treasure_id);

        self.state.treasures.insert(treasure_id, Treasure {
            id: treasure_id,
            hunt_id,
            creator,
            location_commitment,
            reward_amount,
            claimed: false,
            claimed_by: None,
            claimed_at: None,
            difficulty_level,
            metadata_uri: metadata_uri.into(),
            created_at: now,
        });

        debug!(hunt_id, treasure_id, reward_amount, difficulty_level, "Treasure added");
        self.push_event(creator, EventData::TreasureAdded {
            hunt_id,
            treasure_id,
            reward_amount,
            difficulty_level,
        });
        Ok(treasure_id)
    }

    /// Close a hunt to new treasures and claims.
    ///
    /// Returns `false` if it was already inactive. Hunts are never deleted.
    pub fn deactivate_hunt(&mut self, creator: AccountId, hunt_id: HuntId) -> Result<bool, LedgerError> {
        self.authorize(&creator, Role::HuntCreator(hunt_id))?;

        let hunt = self.hunt_mut(hunt_id)?;
        if !hunt.is_active {
            return Ok(false);
        }
        hunt.is_active = false;

        info!(hunt_id, "Hunt deactivated");
        self.push_event(creator, EventData::HuntDeactivated { hunt_id });
        Ok(true)
    }

    /// Get a hunt by id.
    pub fn hunt(&self, hunt_id: HuntId) -> Result<&TreasureHunt, LedgerError> {
        self.state.hunts.get(&hunt_id)
            .ok_or(LedgerError::NotFound(Entity::Hunt(hunt_id)))
    }

    pub(crate) fn hunt_mut(&mut self, hunt_id: HuntId) -> Result<&mut TreasureHunt, LedgerError> {
        self.state.hunts.get_mut(&hunt_id)
            .ok_or(LedgerError::NotFound(Entity::Hunt(hunt_id)))
    }

    /// Get a treasure by id.
    pub fn treasure(&self, treasure_id: TreasureId) -> Result<&Treasure, LedgerError> {
        self.state.treasures.get(&treasure_id)
            .ok_or(LedgerError::NotFound(Entity::Treasure(treasure_id)))
    }

    /// Treasures of a hunt in insertion order.
    pub fn hunt_treasures(&self, hunt_id: HuntId) -> Result<Vec<&Treasure>, LedgerError> {
        let hunt = self.hunt(hunt_id)?;
        Ok(hunt.treasure_ids.iter()
            .filter_map(|id| self.state.treasures.get(id))
            .collect())
    }

    /// Hunts that still accept claims, by id.
    pub fn active_hunts(&self) -> Vec<&TreasureHunt> {
        self.state.hunts.values().filter(|h| h.is_active).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
