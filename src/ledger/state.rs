//! Ledger State
//!
//! The world object every operation runs against. Constructed once at
//! startup and passed around explicitly; there is no ambient global.
//! Uses BTreeMap everywhere for deterministic iteration and hashing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::config::LedgerConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::core::hash::{StateHash, StateHasher};
use crate::core::ids::{AccountId, HuntId, TreasureId, RequestId};
use crate::ledger::error::{Component, LedgerError};
use crate::ledger::events::{EventData, LedgerEvent};
use crate::ledger::hunt::{Treasure, TreasureHunt};
use crate::ledger::player::PlayerStats;
use crate::ledger::registry::GlobalRegistry;
use crate::ledger::reward_pool::RewardPool;
use crate::oracle::registry::OracleRegistry;
use crate::oracle::request::OracleRequest;
use crate::proof::verify::{HashCommitmentVerifier, ProofVerifier};

/// Persistent ledger data.
///
/// Everything a snapshot needs; the clock, verifier and config are
/// supplied again on restore.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Global counters (None until `initialize`).
    pub registry: Option<GlobalRegistry>,

    /// All hunts by id.
    pub hunts: BTreeMap<HuntId, TreasureHunt>,

    /// All treasures by id (each points back at its hunt).
    pub treasures: BTreeMap<TreasureId, Treasure>,

    /// Player records by id.
    pub players: BTreeMap<AccountId, PlayerStats>,

    /// Reward pools by owner.
    pub pools: BTreeMap<AccountId, RewardPool>,

    /// Oracle registry (None until `initialize_oracles`).
    pub oracles: Option<OracleRegistry>,

    /// Every oracle request ever opened.
    pub requests: BTreeMap<RequestId, OracleRequest>,

    /// Digests of location openings already used in a claim.
    ///
    /// Permanent history, never pruned: the digest carries no timestamp,
    /// so dropping an entry would let the same opening be re-stamped and
    /// replayed.
    pub consumed_proofs: BTreeSet<StateHash>,

    /// Sequence number of the last emitted event.
    pub event_sequence: u64,
}

/// The ledger: state plus the collaborators operations need.
pub struct Ledger {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn ProofVerifier>,
    pub(crate) state: LedgerState,
    pending_events: Vec<LedgerEvent>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("pending_events", &self.pending_events.len())
            .finish()
    }
}

impl Ledger {
    /// Create an empty ledger using the wall clock and hash-commitment verifier.
    pub fn new(config: LedgerConfig) -> Self {
        Self::from_state(
            config,
            LedgerState::default(),
            Arc::new(SystemClock),
            Arc::new(HashCommitmentVerifier),
        )
    }

    /// Rebuild a ledger around existing state.
    pub fn from_state(
        config: LedgerConfig,
        state: LedgerState,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Self {
        Self {
            config,
            clock,
            verifier,
            state,
            pending_events: Vec::new(),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the proof verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn ProofVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Ledger configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Persistent state (read-only).
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub(crate) fn verifier(&self) -> &dyn ProofVerifier {
        self.verifier.as_ref()
    }

    /// Global registry, or `NotInitialized`.
    pub fn registry(&self) -> Result<&GlobalRegistry, LedgerError> {
        self.state.registry.as_ref()
            .ok_or(LedgerError::NotInitialized(Component::Registry))
    }

    pub(crate) fn registry_mut(&mut self) -> Result<&mut GlobalRegistry, LedgerError> {
        self.state.registry.as_mut()
            .ok_or(LedgerError::NotInitialized(Component::Registry))
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Record an event for a committed mutation.
    pub(crate) fn push_event(&mut self, actor: AccountId, data: EventData) {
        self.state.event_sequence += 1;
        let event = LedgerEvent {
            sequence: self.state.event_sequence,
            timestamp: self.now(),
            actor,
            data,
        };
        self.pending_events.push(event);
    }

    /// Compute hash of the persistent state.
    ///
    /// Two ledgers with equal hashes hold identical data; tests use this
    /// to show that rejected operations changed nothing.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_ledger_state();
        let state = &self.state;

        match &state.registry {
            Some(registry) => {
                hasher.update_u8(1);
                registry.hash_into(&mut hasher);
            }
            None => hasher.update_u8(0),
        }

        hasher.update_u64(state.hunts.len() as u64);
        for hunt in state.hunts.values() {
            hunt.hash_into(&mut hasher);
        }

        hasher.update_u64(state.treasures.len() as u64);
        for treasure in state.treasures.values() {
            treasure.hash_into(&mut hasher);
        }

        hasher.update_u64(state.players.len() as u64);
        for player in state.players.values() {
            player.hash_into(&mut hasher);
        }

        hasher.update_u64(state.pools.len() as u64);
        for pool in state.pools.values() {
            pool.hash_into(&mut hasher);
        }

        match &state.oracles {
            Some(oracles) => {
                hasher.update_u8(1);
                oracles.hash_into(&mut hasher);
            }
            None => hasher.update_u8(0),
        }

        hasher.update_u64(state.requests.len() as u64);
        for request in state.requests.values() {
            request.hash_into(&mut hasher);
        }

        hasher.update_u64(state.consumed_proofs.len() as u64);
        for digest in &state.consumed_proofs {
            hasher.update_bytes(digest);
        }

        hasher.update_u64(state.event_sequence);
        hasher.finalize()
    }
}

// =============================================================================
// TESTS
// =============================================================================
