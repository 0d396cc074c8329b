//! Player Directory & Trust
//!
//! Player records are created lazily on first registration. Trust is a
//! bounded score in `[0, 100]`, overwritten by claims and by the admin.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::hash::StateHasher;
use crate::core::ids::AccountId;
use crate::ledger::error::{Entity, LedgerError};
use crate::ledger::events::EventData;
use crate::ledger::guard::Role;
use crate::ledger::state::Ledger;

/// Trust score assigned at registration.
pub const DEFAULT_TRUST_SCORE: u8 = 100;

/// Upper bound of the trust scale.
pub const MAX_TRUST_SCORE: u8 = 100;

/// Standing of a single player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Player identifier
    pub player_id: AccountId,
    /// Treasures claimed.
    pub total_treasures_found: u64,
    /// Sum of claimed rewards.
    pub total_rewards_earned: u64,
    /// Reputation, 0..=100.
    pub trust_score: u8,
    /// Unix time of registration.
    pub joined_at: u64,
    /// Unix time of the last claim or trust update.
    pub last_activity: u64,
}

impl PlayerStats {
    /// New record with default trust.
    pub fn new(player_id: AccountId, now: u64) -> Self {
        Self {
            player_id,
            total_treasures_found: 0,
            total_rewards_earned: 0,
            trust_score: DEFAULT_TRUST_SCORE,
            joined_at: now,
            last_activity: now,
        }
    }

    /// Tier of the current trust score.
    pub fn tier(&self) -> TrustTier {
        TrustTier::from_score(self.trust_score)
    }

    /// Hash this player's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_account(&self.player_id);
        hasher.update_u64(self.total_treasures_found);
        hasher.update_u64(self.total_rewards_earned);
        hasher.update_u8(self.trust_score);
        hasher.update_u64(self.joined_at);
        hasher.update_u64(self.last_activity);
    }
}

/// Coarse trust classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrustTier {
    /// Below 40: not allowed to claim under the default threshold
    Restricted = 0,
    /// 40..60
    Low = 1,
    /// 60..70
    Fair = 2,
    /// 70..80
    Good = 3,
    /// 80..90
    High = 4,
    /// 90 and above
    Excellent = 5,
}

impl TrustTier {
    /// Classify a score.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => TrustTier::Excellent,
            80..=89 => TrustTier::High,
            70..=79 => TrustTier::Good,
            60..=69 => TrustTier::Fair,
            40..=59 => TrustTier::Low,
            _ => TrustTier::Restricted,
        }
    }

    /// Lowest score in this tier.
    pub fn floor(self) -> u8 {
        match self {
            TrustTier::Excellent => 90,
            TrustTier::High => 80,
            TrustTier::Good => 70,
            TrustTier::Fair => 60,
            TrustTier::Low => 40,
            TrustTier::Restricted => 0,
        }
    }
}

/// Which branch of the registration upsert ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// A new record was created.
    Created,
    /// The player already existed; nothing changed.
    Existing,
}

impl Ledger {
    /// Register a player (create-if-absent).
    ///
    /// The `Existing` branch is a no-op: no field changes, no event.
    pub fn register(&mut self, player: AccountId) -> Result<Registration, LedgerError> {
        let total_players = self.registry()?.total_players;
        if self.state.players.contains_key(&player) {
            return Ok(Registration::Existing);
        }
        let total_players = total_players.checked_add(1)
            .ok_or_else(|| LedgerError::overflow("total_players"))?;

        let now = self.now();
        self.registry_mut()?.total_players = total_players;
        self.state.players.insert(player, PlayerStats::new(player, now));

        debug!(player = %player.short(), total_players, "Player registered");
        self.push_event(player, EventData::PlayerRegistered { player });
        Ok(Registration::Created)
    }

    /// Overwrite a player's trust score (admin only).
    ///
    /// Unknown players are a no-op and return `false`.
    pub fn update_trust_score(
        &mut self,
        caller: AccountId,
        player: AccountId,
        new_score: u8,
    ) -> Result<bool, LedgerError> {
        self.authorize(&caller, Role::Admin)?;
        if new_score > MAX_TRUST_SCORE {
            return Err(LedgerError::InvalidArgument(format!(
                "trust score {} exceeds {}", new_score, MAX_TRUST_SCORE
            )));
        }

        let now = self.now();
        let Some(stats) = self.state.players.get_mut(&player) else {
            debug!(player = %player.short(), "Trust update for unknown player ignored");
            return Ok(false);
        };
        let old_score = stats.trust_score;
        stats.trust_score = new_score;
        stats.last_activity = now;

        info!(player = %player.short(), old_score, new_score, "Trust score updated");
        self.push_event(caller, EventData::TrustScoreUpdated { player, old_score, new_score });
        Ok(true)
    }

    /// Get a player record.
    pub fn player(&self, player: &AccountId) -> Result<&PlayerStats, LedgerError> {
        self.state.players.get(player)
            .ok_or(LedgerError::NotFound(Entity::Player(*player)))
    }

    /// Top players by rewards earned, then treasures found, then id.
    pub fn leaderboard(&self, limit: usize) -> Vec<&PlayerStats> {
        let mut players: Vec<_> = self.state.players.values().collect();
        players.sort_by(|a, b| {
            b.total_rewards_earned.cmp(&a.total_rewards_earned)
                .then(b.total_treasures_found.cmp(&a.total_treasures_found))
                .then(a.player_id.cmp(&b.player_id))
        });
        players.truncate(limit);
        players
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    fn admin() -> AccountId {
        AccountId::new([0xad; 16])
    }

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new(LedgerConfig::with_admin(admin()));
        ledger.initialize(admin()).unwrap();
        ledger.take_events();
        ledger
    }

    #[test]
    fn test_register_creates_record() {
        let mut ledger = ledger();
        let player = AccountId::new([1; 16]);

        assert_eq!(ledger.register(player).unwrap(), Registration::Created);

        let stats = ledger.player(&player).unwrap();
        assert_eq!(stats.trust_score, DEFAULT_TRUST_SCORE);
        assert_eq!(stats.total_treasures_found, 0);
        assert_eq!(ledger.registry().unwrap().total_players, 1);
        assert_eq!(ledger.take_events().len(), 1);
    }

    #[test]
    fn test_register_twice_is_noop() {
        let mut ledger = ledger();
        let player = AccountId::new([1; 16]);
        ledger.register(player).unwrap();
        ledger.take_events();
        let hash = ledger.compute_hash();

        assert_eq!(ledger.register(player).unwrap(), Registration::Existing);
        assert_eq!(ledger.compute_hash(), hash);
        assert!(ledger.take_events().is_empty());
        assert_eq!(ledger.registry().unwrap().total_players, 1);
    }

    #[test]
    fn test_update_trust_score() {
        let mut ledger = ledger();
        let player = AccountId::new([1; 16]);
        ledger.register(player).unwrap();

        assert!(ledger.update_trust_score(admin(), player, 55).unwrap());
        let stats = ledger.player(&player).unwrap();
        assert_eq!(stats.trust_score, 55);
        assert_eq!(stats.tier(), TrustTier::Low);
    }

    #[test]
    fn test_update_trust_score_requires_admin() {
        let mut ledger = ledger();
        let player = AccountId::new([1; 16]);
        ledger.register(player).unwrap();

        let result = ledger.update_trust_score(player, player, 10);
        assert!(matches!(result, Err(LedgerError::Unauthorized { role: Role::Admin, .. })));
        assert_eq!(ledger.player(&player).unwrap().trust_score, DEFAULT_TRUST_SCORE);
    }

    #[test]
    fn test_update_trust_score_unknown_player_is_noop() {
        let mut ledger = ledger();
        let hash = ledger.compute_hash();

        assert!(!ledger.update_trust_score(admin(), AccountId::new([9; 16]), 10).unwrap());
        assert_eq!(ledger.compute_hash(), hash);
    }

    #[test]
    fn test_update_trust_score_out_of_range() {
        let mut ledger = ledger();
        let player = AccountId::new([1; 16]);
        ledger.register(player).unwrap();

        assert!(matches!(
            ledger.update_trust_score(admin(), player, 101),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_trust_tiers() {
        assert_eq!(TrustTier::from_score(100), TrustTier::Excellent);
        assert_eq!(TrustTier::from_score(90), TrustTier::Excellent);
        assert_eq!(TrustTier::from_score(89), TrustTier::High);
        assert_eq!(TrustTier::from_score(70), TrustTier::Good);
        assert_eq!(TrustTier::from_score(60), TrustTier::Fair);
        assert_eq!(TrustTier::from_score(40), TrustTier::Low);
        assert_eq!(TrustTier::from_score(39), TrustTier::Restricted);
        assert_eq!(TrustTier::from_score(0), TrustTier::Restricted);

        for tier in [TrustTier::Restricted, TrustTier::Low, TrustTier::Fair, TrustTier::Good, TrustTier::High, TrustTier::Excellent] {
            assert_eq!(TrustTier::from_score(tier.floor()), tier);
        }
    }

    #[test]
    fn test_leaderboard_order() {
        let mut ledger = ledger();
        let ids: Vec<_> = (1..=3).map(|i| AccountId::new([i; 16])).collect();
        for id in &ids {
            ledger.register(*id).unwrap();
        }
        ledger.state.players.get_mut(&ids[0]).unwrap().total_rewards_earned = 50;
        ledger.state.players.get_mut(&ids[2]).unwrap().total_rewards_earned = 80;

        let top: Vec<_> = ledger.leaderboard(2).iter().map(|p| p.player_id).collect();
        assert_eq!(top, vec![ids[2], ids[0]]);
    }

    #[test]
    fn test_player_not_found() {
        let ledger = ledger();
        let id = AccountId::new([4; 16]);
        assert_eq!(ledger.player(&id).unwrap_err(), LedgerError::NotFound(Entity::Player(id)));
    }
}
