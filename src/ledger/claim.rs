//! Claim Settlement
//!
//! `Unclaimed -> Claimed` is one-way. A claim first evaluates every
//! check and computes every new value, then applies them all at once.
//! Nothing after the commit point can fail, so a rejected claim leaves
//! hunt, treasure, player, registry and pool untouched.

use tracing::{info, warn};

use crate::core::ids::{AccountId, HuntId, TreasureId};
use crate::ledger::error::{Entity, LedgerError, ProofRejection};
use crate::ledger::events::EventData;
use crate::ledger::player::{PlayerStats, MAX_TRUST_SCORE};
use crate::ledger::reward_pool::PendingReward;
use crate::ledger::state::Ledger;
use crate::proof::commitment::LocationProof;

/// Outcome of a successful claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimReceipt {
    /// Hunt the treasure belongs to.
    pub hunt_id: HuntId,
    /// Claimed treasure.
    pub treasure_id: TreasureId,
    /// Reward credited to the player.
    pub reward_amount: u64,
    /// Unix time of the claim.
    pub claimed_at: u64,
    /// Trust score recorded with the claim.
    pub trust_score: u8,
    /// The claim registered the player as a side effect.
    pub registered: bool,
    /// A pending reward was queued in the hunt creator's pool.
    pub reward_queued: bool,
    /// This claim took the last unclaimed treasure of the hunt.
    pub hunt_completed: bool,
}

impl Ledger {
    /// Claim a treasure.
    ///
    /// `trust_score` is the caller-supplied anti-cheat score for this
    /// attempt (clamped to 100); it is stored on the player and carried
    /// in the `TreasureClaimed` event. Eligibility is decided by the
    /// score already stored, not the supplied one.
    pub fn claim(
        &mut self,
        player: AccountId,
        treasure_id: TreasureId,
        proof: &LocationProof,
        trust_score: u8,
    ) -> Result<ClaimReceipt, LedgerError> {
        let now = self.now();
        let registry = self.registry()?;
        let existing = self.state.players.get(&player);

        let treasure = self.treasure(treasure_id)?;
        if treasure.claimed {
            return Err(LedgerError::AlreadyClaimed(treasure_id));
        }
        let hunt_id = treasure.hunt_id;
        let reward_amount = treasure.reward_amount;

        let hunt = self.hunt(hunt_id)?;
        if !hunt.is_active {
            return Err(LedgerError::HuntInactive(hunt_id));
        }
        let creator = hunt.creator;

        if let Some(stats) = existing {
            let required = self.config().min_claim_trust;
            if stats.trust_score < required {
                warn!(player = %player.short(), score = stats.trust_score, "Claim refused: low trust");
                return Err(LedgerError::TrustTooLow { score: stats.trust_score, required });
            }
        }

        self.check_proof_window(proof, now)?;
        let proof_digest = proof.digest();
        if self.state.consumed_proofs.contains(&proof_digest) {
            return Err(LedgerError::InvalidProof(ProofRejection::Replayed));
        }
        if !self.verifier().verify(&treasure.location_commitment, proof) {
            return Err(LedgerError::InvalidProof(ProofRejection::Mismatch));
        }

        let queue_reward = match self.state.pools.get(&creator) {
            Some(pool) => {
                pool.ensure_can_pay(reward_amount)?;
                true
            }
            None => false,
        };

        // Compute every new value before touching state.
        let trust_score = trust_score.min(MAX_TRUST_SCORE);
        let registered = existing.is_none();
        let mut stats = existing.cloned().unwrap_or_else(|| PlayerStats::new(player, now));
        stats.total_treasures_found = stats.total_treasures_found.checked_add(1)
            .ok_or_else(|| LedgerError::overflow("total_treasures_found"))?;
        stats.total_rewards_earned = stats.total_rewards_earned.checked_add(reward_amount)
            .ok_or_else(|| LedgerError::overflow("total_rewards_earned"))?;
        stats.trust_score = trust_score;
        stats.last_activity = now;

        let total_rewards_distributed = registry.total_rewards_distributed
            .checked_add(reward_amount)
            .ok_or_else(|| LedgerError::overflow("total_rewards_distributed"))?;
        let total_players = if registered {
            registry.total_players.checked_add(1)
                .ok_or_else(|| LedgerError::overflow("total_players"))?
        } else {
            registry.total_players
        };

        // Commit.
        if let Some(registry) = self.state.registry.as_mut() {
            registry.total_rewards_distributed = total_rewards_distributed;
            registry.total_players = total_players;
        }
        if let Some(treasure) = self.state.treasures.get_mut(&treasure_id) {
            treasure.claimed = true;
            treasure.claimed_by = Some(player);
            treasure.claimed_at = Some(now);
        }
        let mut hunt_completed = false;
        if let Some(hunt) = self.state.hunts.get_mut(&hunt_id) {
            hunt.claimed_treasures += 1;
            hunt.participant_count += 1;
            hunt_completed = hunt.is_completed();
        }
        self.state.players.insert(player, stats);
        self.state.consumed_proofs.insert(proof_digest);
        if queue_reward {
            if let Some(pool) = self.state.pools.get_mut(&creator) {
                pool.pending_rewards.push(PendingReward {
                    player,
                    amount: reward_amount,
                    treasure_id,
                    created_at: now,
                });
            }
        }

        info!(
            hunt_id, treasure_id, player = %player.short(), reward_amount, trust_score,
            "Treasure claimed"
        );
        if hunt_completed {
            info!(hunt_id, "Hunt completed");
        }
        if registered {
            self.push_event(player, EventData::PlayerRegistered { player });
        }
        self.push_event(player, EventData::TreasureClaimed {
            hunt_id,
            treasure_id,
            claimer: player,
            amount: reward_amount,
            trust_score,
        });
        if queue_reward {
            self.push_event(player, EventData::PendingRewardCreated {
                owner: creator,
                player,
                treasure_id,
                amount: reward_amount,
            });
        }

        Ok(ClaimReceipt {
            hunt_id,
            treasure_id,
            reward_amount,
            claimed_at: now,
            trust_score,
            registered,
            reward_queued: queue_reward,
            hunt_completed,
        })
    }

    /// Reject proofs outside `[now - max_age, now + skew]`.
    fn check_proof_window(&self, proof: &LocationProof, now: u64) -> Result<(), LedgerError> {
        let config = self.config();
        if proof.issued_at > now.saturating_add(config.proof_clock_skew_secs) {
            return Err(LedgerError::InvalidProof(ProofRejection::FromFuture));
        }
        if proof.issued_at < now.saturating_sub(config.proof_max_age_secs) {
            return Err(LedgerError::InvalidProof(ProofRejection::Stale));
        }
        Ok(())
    }

    /// Treasures a player has claimed, by id.
    pub fn claims_by(&self, player: &AccountId) -> Vec<TreasureId> {
        self.state.treasures.values()
            .filter(|t| t.claimed_by.as_ref() == Some(player))
            .map(|t| t.id)
            .collect()
    }

    /// Claimer of a treasure, if any.
    pub fn claimer_of(&self, treasure_id: TreasureId) -> Result<Option<AccountId>, LedgerError> {
        self.state.treasures.get(&treasure_id)
            .map(|t| t.claimed_by)
            .ok_or(LedgerError::NotFound(Entity::Treasure(treasure_id)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use proptest::prelude::*;

    use crate::config::LedgerConfig;
    use crate::core::clock::ManualClock;
    use crate::proof::commitment::LocationCommitment;
    use crate::proof::verify::FixedVerifier;

    const NOW: u64 = 1_700_000_000;
    const SALT: [u8; 32] = [0x5a; 32];

    fn admin() -> AccountId {
        AccountId::new([0xad; 16])
    }

    fn creator() -> AccountId {
        AccountId::new([0xc0; 16])
    }

    fn player(n: u8) -> AccountId {
        AccountId::new([n; 16])
    }

    fn location(n: u64) -> Vec<u8> {
        format!("cell-{}", n).into_bytes()
    }

    fn proof(n: u64) -> LocationProof {
        LocationProof::new(location(n), SALT, NOW)
    }

    /// Initialized ledger with one 1,000,000 hunt and one 100,000 treasure
    /// hidden at `location(1)`.
    fn setup() -> (Ledger, Arc<ManualClock>, HuntId, TreasureId) {
        let clock = Arc::new(ManualClock::new(NOW));
        let mut ledger = Ledger::new(LedgerConfig::with_admin(admin()))
            .with_clock(clock.clone());
        ledger.initialize(admin()).unwrap();
        let hunt_id = ledger.create_hunt(creator(), "City Hunt", "", 1_000_000).unwrap();
        let treasure_id = ledger
            .add_treasure(creator(), hunt_id, LocationCommitment::commit(&location(1), &SALT), 100_000, "", 2)
            .unwrap();
        ledger.take_events();
        (ledger, clock, hunt_id, treasure_id)
    }

    #[test]
    fn test_claim_settles_everything() {
        let (mut ledger, _clock, hunt_id, treasure_id) = setup();
        let p = player(1);
        ledger.register(p).unwrap();
        ledger.take_events();

        let receipt = ledger.claim(p, treasure_id, &proof(1), 92).unwrap();
        assert_eq!(receipt.reward_amount, 100_000);
        assert!(!receipt.registered);
        assert!(!receipt.reward_queued);
        assert!(receipt.hunt_completed);

        let treasure = ledger.treasure(treasure_id).unwrap();
        assert!(treasure.claimed);
        assert_eq!(treasure.claimed_by, Some(p));
        assert_eq!(treasure.claimed_at, Some(NOW));

        let hunt = ledger.hunt(hunt_id).unwrap();
        assert_eq!(hunt.claimed_treasures, 1);
        assert_eq!(hunt.participant_count, 1);
        assert_eq!(hunt.remaining_rewards, 900_000);
        assert!(hunt.is_completed());

        let stats = ledger.player(&p).unwrap();
        assert_eq!(stats.total_treasures_found, 1);
        assert_eq!(stats.total_rewards_earned, 100_000);
        assert_eq!(stats.trust_score, 92);
        assert_eq!(ledger.registry().unwrap().total_rewards_distributed, 100_000);

        let events = ledger.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, EventData::TreasureClaimed {
            hunt_id,
            treasure_id,
            claimer: p,
            amount: 100_000,
            trust_score: 92,
        });
        assert_eq!(events[0].timestamp, NOW);
        assert_eq!(ledger.claims_by(&p), vec![treasure_id]);
        assert_eq!(ledger.claimer_of(treasure_id).unwrap(), Some(p));
    }

    #[test]
    fn test_claim_registers_new_player() {
        let (mut ledger, _clock, _hunt_id, treasure_id) = setup();
        let p = player(1);

        let receipt = ledger.claim(p, treasure_id, &proof(1), 100).unwrap();
        assert!(receipt.registered);
        assert_eq!(ledger.registry().unwrap().total_players, 1);
        assert_eq!(ledger.player(&p).unwrap().joined_at, NOW);

        let kinds: Vec<_> = ledger.take_events().iter().map(|e| e.data.kind()).collect();
        assert_eq!(kinds, vec!["player_registered", "treasure_claimed"]);
    }

    #[test]
    fn test_second_claim_fails_without_side_effects() {
        let (mut ledger, _clock, _hunt_id, treasure_id) = setup();
        ledger.claim(player(1), treasure_id, &proof(1), 100).unwrap();
        ledger.take_events();
        let hash = ledger.compute_hash();

        // Same player, fresh proof
        let again = LocationProof::new(location(1), SALT, NOW - 1);
        assert_eq!(
            ledger.claim(player(1), treasure_id, &again, 100),
            Err(LedgerError::AlreadyClaimed(treasure_id))
        );
        // Different player
        assert_eq!(
            ledger.claim(player(2), treasure_id, &again, 100),
            Err(LedgerError::AlreadyClaimed(treasure_id))
        );
        assert_eq!(ledger.compute_hash(), hash);
        assert!(ledger.take_events().is_empty());
        assert!(ledger.player(&player(2)).is_err());
    }

    #[test]
    fn test_claim_unknown_treasure() {
        let (mut ledger, _clock, _hunt_id, _treasure_id) = setup();
        let hash = ledger.compute_hash();

        assert_eq!(
            ledger.claim(player(1), 42, &proof(1), 100),
            Err(LedgerError::NotFound(Entity::Treasure(42)))
        );
        // The failed claim did not register the player either
        assert_eq!(ledger.compute_hash(), hash);
    }

    #[test]
    fn test_claim_wrong_location() {
        let (mut ledger, _clock, _hunt_id, treasure_id) = setup();
        let hash = ledger.compute_hash();

        // Same length as the real location, which a length check would accept
        assert_eq!(
            ledger.claim(player(1), treasure_id, &proof(2), 100),
            Err(LedgerError::InvalidProof(ProofRejection::Mismatch))
        );
        assert_eq!(ledger.compute_hash(), hash);
        assert!(!ledger.treasure(treasure_id).unwrap().claimed);
    }

    #[test]
    fn test_claim_proof_freshness() {
        let (mut ledger, clock, _hunt_id, treasure_id) = setup();
        let stale = LocationProof::new(location(1), SALT, NOW - 301);
        let future = LocationProof::new(location(1), SALT, NOW + 31);

        assert_eq!(
            ledger.claim(player(1), treasure_id, &stale, 100),
            Err(LedgerError::InvalidProof(ProofRejection::Stale))
        );
        assert_eq!(
            ledger.claim(player(1), treasure_id, &future, 100),
            Err(LedgerError::InvalidProof(ProofRejection::FromFuture))
        );

        // The future proof becomes valid once the clock catches up
        clock.advance(31);
        assert!(ledger.claim(player(1), treasure_id, &future, 100).is_ok());
    }

    #[test]
    fn test_claim_proof_replay_rejected() {
        let (mut ledger, _clock, hunt_id, first) = setup();
        // Second treasure hidden at the same spot with the same salt
        let second = ledger
            .add_treasure(creator(), hunt_id, LocationCommitment::commit(&location(1), &SALT), 1_000, "", 1)
            .unwrap();

        let receipt = ledger.claim(player(1), first, &proof(1), 100).unwrap();
        assert!(!receipt.hunt_completed);
        let hash = ledger.compute_hash();
        assert_eq!(
            ledger.claim(player(2), second, &proof(1), 100),
            Err(LedgerError::InvalidProof(ProofRejection::Replayed))
        );

        // Re-stamping the same opening does not make it a new proof
        for issued_at in [NOW - 1, NOW + 1, NOW - 300] {
            let restamped = LocationProof::new(location(1), SALT, issued_at);
            assert_eq!(
                ledger.claim(player(2), second, &restamped, 100),
                Err(LedgerError::InvalidProof(ProofRejection::Replayed))
            );
        }
        assert_eq!(ledger.compute_hash(), hash);
        assert_eq!(ledger.state().consumed_proofs.len(), 1);
        assert!(!ledger.treasure(second).unwrap().claimed);
    }

    #[test]
    fn test_claim_on_inactive_hunt() {
        let (mut ledger, _clock, hunt_id, treasure_id) = setup();
        ledger.deactivate_hunt(creator(), hunt_id).unwrap();

        assert_eq!(
            ledger.claim(player(1), treasure_id, &proof(1), 100),
            Err(LedgerError::HuntInactive(hunt_id))
        );
    }

    #[test]
    fn test_claim_trust_gate() {
        let (mut ledger, _clock, _hunt_id, treasure_id) = setup();
        let p = player(1);
        ledger.register(p).unwrap();
        ledger.update_trust_score(admin(), p, 39).unwrap();

        assert_eq!(
            ledger.claim(p, treasure_id, &proof(1), 100),
            Err(LedgerError::TrustTooLow { score: 39, required: 40 })
        );

        ledger.update_trust_score(admin(), p, 40).unwrap();
        assert!(ledger.claim(p, treasure_id, &proof(1), 100).is_ok());
    }

    #[test]
    fn test_supplied_trust_is_clamped() {
        let (mut ledger, _clock, _hunt_id, treasure_id) = setup();
        let receipt = ledger.claim(player(1), treasure_id, &proof(1), 250).unwrap();
        assert_eq!(receipt.trust_score, 100);
        assert_eq!(ledger.player(&player(1)).unwrap().trust_score, 100);
    }

    #[test]
    fn test_claim_queues_reward_in_creator_pool() {
        let (mut ledger, _clock, _hunt_id, treasure_id) = setup();
        ledger.initialize_pool(creator(), 500_000).unwrap();

        let receipt = ledger.claim(player(1), treasure_id, &proof(1), 100).unwrap();
        assert!(receipt.reward_queued);

        let pending = ledger.pending_rewards(&creator()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].player, player(1));
        assert_eq!(pending[0].amount, 100_000);
        assert_eq!(pending[0].treasure_id, treasure_id);

        assert_eq!(ledger.distribute_reward(creator(), player(1), treasure_id).unwrap(), 100_000);
    }

    #[test]
    fn test_underfunded_pool_aborts_claim() {
        let (mut ledger, _clock, _hunt_id, treasure_id) = setup();
        ledger.initialize_pool(creator(), 99_999).unwrap();
        let hash = ledger.compute_hash();

        assert_eq!(
            ledger.claim(player(1), treasure_id, &proof(1), 100),
            Err(LedgerError::InsufficientFunds { requested: 100_000, available: 99_999 })
        );
        assert_eq!(ledger.compute_hash(), hash);
    }

    #[test]
    fn test_claim_requires_registry() {
        let mut ledger = Ledger::new(LedgerConfig::default());
        assert!(matches!(
            ledger.claim(player(1), 1, &proof(1), 100),
            Err(LedgerError::NotInitialized(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_rewards_are_conserved(
            rewards in prop::collection::vec(1u64..50_000, 1..20),
            claim_mask in prop::collection::vec(any::<bool>(), 20),
        ) {
            let mut ledger = Ledger::new(LedgerConfig::with_admin(admin()))
                .with_clock(Arc::new(ManualClock::new(NOW)))
                .with_verifier(Arc::new(FixedVerifier(true)));
            ledger.initialize(admin()).unwrap();
            let pool: u64 = 1_000_000;
            let hunt_id = ledger.create_hunt(creator(), "Prop Hunt", "", pool).unwrap();

            let mut added = Vec::new();
            for (i, reward) in rewards.iter().enumerate() {
                let commitment = LocationCommitment::commit(&location(i as u64), &SALT);
                if let Ok(id) = ledger.add_treasure(creator(), hunt_id, commitment, *reward, "", 1) {
                    added.push((id, *reward));
                }
            }

            let mut claimed_sum = 0u64;
            for (i, (id, reward)) in added.iter().enumerate() {
                if claim_mask[i] {
                    ledger.claim(player((i % 7) as u8 + 1), *id, &proof(i as u64), 80).unwrap();
                    claimed_sum += reward;
                }
            }

            let hunt = ledger.hunt(hunt_id).unwrap();
            let allocated: u64 = added.iter().map(|(_, r)| r).sum();
            prop_assert_eq!(hunt.remaining_rewards + allocated, hunt.total_reward_pool);
            prop_assert!(hunt.claimed_treasures <= hunt.total_treasures);
            prop_assert_eq!(ledger.registry().unwrap().total_rewards_distributed, claimed_sum);

            let earned: u64 = ledger.state().players.values().map(|p| p.total_rewards_earned).sum();
            prop_assert_eq!(earned, claimed_sum);
        }
    }
}
