//! Ledger Engine
//!
//! Async front for the `Ledger`. Every mutating call takes one write lock
//! for its whole duration, so operations from concurrent callers are
//! applied one at a time in a single total order. Events produced by an
//! operation are published before the lock is released, so subscribers
//! see them in sequence order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::core::hash::StateHash;
use crate::core::ids::{AccountId, HuntId, RequestId, TreasureId};
use crate::ledger::claim::ClaimReceipt;
use crate::ledger::error::LedgerError;
use crate::ledger::events::LedgerEvent;
use crate::ledger::hunt::{Treasure, TreasureHunt};
use crate::ledger::player::{PlayerStats, Registration};
use crate::ledger::registry::GlobalRegistry;
use crate::ledger::reward_pool::RewardPool;
use crate::ledger::state::Ledger;
use crate::oracle::registry::OracleRegistry;
use crate::oracle::request::{OracleRequest, OracleResponse, RequestType, ResponseReceipt};
use crate::proof::commitment::{LocationCommitment, LocationProof};
use crate::snapshot::Snapshot;

/// Shared, serialized access to a ledger.
#[derive(Clone)]
pub struct LedgerEngine {
    ledger: Arc<RwLock<Ledger>>,
    events_tx: broadcast::Sender<LedgerEvent>,
}

impl LedgerEngine {
    /// Wrap a ledger. The event channel holds `config.event_capacity`
    /// events per lagging subscriber.
    pub fn new(ledger: Ledger) -> Self {
        let capacity = ledger.config().event_capacity.max(1);
        let (events_tx, _) = broadcast::channel(capacity);
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            events_tx,
        }
    }

    /// Receive every event committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events_tx.subscribe()
    }

    /// Run `op` under the write lock and publish what it emitted.
    async fn apply<T>(&self, op: impl FnOnce(&mut Ledger) -> T) -> T {
        let mut ledger = self.ledger.write().await;
        let result = op(&mut *ledger);

        for event in ledger.take_events() {
            debug!(sequence = event.sequence, kind = event.data.kind(), "Event committed");
            #[cfg(feature = "debug-tracing")]
            if let Ok(json) = event.to_json() {
                debug!(event = %json, "Event payload");
            }
            // No subscribers is fine; the ledger state is authoritative.
            let _ = self.events_tx.send(event);
        }
        result
    }

    /// `apply` for fallible operations; rejections are logged.
    async fn execute<T>(
        &self,
        name: &'static str,
        op: impl FnOnce(&mut Ledger) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let result = self.apply(op).await;
        if let Err(e) = &result {
            warn!(op = name, error = %e, "Operation rejected");
        }
        result
    }

    /// Run a read-only closure under the read lock.
    pub async fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let ledger = self.ledger.read().await;
        f(&*ledger)
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// See [`Ledger::initialize`].
    pub async fn initialize(&self, caller: AccountId) -> Result<(), LedgerError> {
        self.execute("initialize", |l| l.initialize(caller)).await
    }

    /// See [`Ledger::set_fee_percentage`].
    pub async fn set_fee_percentage(&self, caller: AccountId, percentage: u8) -> Result<(), LedgerError> {
        self.execute("set_fee_percentage", |l| l.set_fee_percentage(caller, percentage)).await
    }

    // =========================================================================
    // Hunts
    // =========================================================================

    /// See [`Ledger::create_hunt`].
    pub async fn create_hunt(
        &self,
        creator: AccountId,
        title: impl Into<String>,
        description: impl Into<String>,
        reward_pool_amount: u64,
    ) -> Result<HuntId, LedgerError> {
        let (title, description) = (title.into(), description.into());
        self.execute("create_hunt", |l| l.create_hunt(creator, title, description, reward_pool_amount)).await
    }

    /// See [`Ledger::add_treasure`].
    pub async fn add_treasure(
        &self,
        creator: AccountId,
        hunt_id: HuntId,
        location_commitment: LocationCommitment,
        reward_amount: u64,
        metadata_uri: impl Into<String>,
        difficulty_level: u8,
    ) -> Result<TreasureId, LedgerError> {
        let metadata_uri = metadata_uri.into();
        self.execute("add_treasure", |l| {
            l.add_treasure(creator, hunt_id, location_commitment, reward_amount, metadata_uri, difficulty_level)
        }).await
    }

    /// See [`Ledger::deactivate_hunt`].
    pub async fn deactivate_hunt(&self, creator: AccountId, hunt_id: HuntId) -> Result<bool, LedgerError> {
        self.execute("deactivate_hunt", |l| l.deactivate_hunt(creator, hunt_id)).await
    }

    // =========================================================================
    // Players & claims
    // =========================================================================

    /// See [`Ledger::register`].
    pub async fn register(&self, player: AccountId) -> Result<Registration, LedgerError> {
        self.execute("register", |l| l.register(player)).await
    }

    /// See [`Ledger::update_trust_score`].
    pub async fn update_trust_score(
        &self,
        caller: AccountId,
        player: AccountId,
        new_score: u8,
    ) -> Result<bool, LedgerError> {
        self.execute("update_trust_score", |l| l.update_trust_score(caller, player, new_score)).await
    }

    /// See [`Ledger::claim`].
    pub async fn claim(
        &self,
        player: AccountId,
        treasure_id: TreasureId,
        proof: LocationProof,
        trust_score: u8,
    ) -> Result<ClaimReceipt, LedgerError> {
        self.execute("claim", |l| l.claim(player, treasure_id, &proof, trust_score)).await
    }

    // =========================================================================
    // Reward pools
    // =========================================================================

    /// See [`Ledger::initialize_pool`].
    pub async fn initialize_pool(&self, owner: AccountId, initial_funds: u64) -> Result<(), LedgerError> {
        self.execute("initialize_pool", |l| l.initialize_pool(owner, initial_funds)).await
    }

    /// See [`Ledger::add_funds`].
    pub async fn add_funds(&self, owner: AccountId, amount: u64) -> Result<u64, LedgerError> {
        self.execute("add_funds", |l| l.add_funds(owner, amount)).await
    }

    /// See [`Ledger::create_pending_reward`].
    pub async fn create_pending_reward(
        &self,
        owner: AccountId,
        player: AccountId,
        amount: u64,
        treasure_id: TreasureId,
    ) -> Result<(), LedgerError> {
        self.execute("create_pending_reward", |l| l.create_pending_reward(owner, player, amount, treasure_id)).await
    }

    /// See [`Ledger::distribute_reward`].
    pub async fn distribute_reward(
        &self,
        owner: AccountId,
        player: AccountId,
        treasure_id: TreasureId,
    ) -> Result<u64, LedgerError> {
        self.execute("distribute_reward", |l| l.distribute_reward(owner, player, treasure_id)).await
    }

    // =========================================================================
    // Oracles
    // =========================================================================

    /// See [`Ledger::initialize_oracles`].
    pub async fn initialize_oracles(&self, caller: AccountId) -> Result<(), LedgerError> {
        self.execute("initialize_oracles", |l| l.initialize_oracles(caller)).await
    }

    /// See [`Ledger::authorize_oracle`].
    pub async fn authorize_oracle(&self, caller: AccountId, oracle: AccountId) -> Result<bool, LedgerError> {
        self.execute("authorize_oracle", |l| l.authorize_oracle(caller, oracle)).await
    }

    /// See [`Ledger::revoke_oracle`].
    pub async fn revoke_oracle(&self, caller: AccountId, oracle: AccountId) -> Result<bool, LedgerError> {
        self.execute("revoke_oracle", |l| l.revoke_oracle(caller, oracle)).await
    }

    /// See [`Ledger::heartbeat`].
    pub async fn heartbeat(&self, oracle: AccountId) -> Result<(), LedgerError> {
        self.execute("heartbeat", |l| l.heartbeat(oracle)).await
    }

    /// See [`Ledger::create_request`].
    pub async fn create_request(
        &self,
        requester: AccountId,
        request_type: RequestType,
        input_data: Vec<u8>,
        treasure_id: Option<TreasureId>,
    ) -> Result<RequestId, LedgerError> {
        self.execute("create_request", |l| l.create_request(requester, request_type, input_data, treasure_id)).await
    }

    /// See [`Ledger::submit_response`].
    pub async fn submit_response(
        &self,
        oracle: AccountId,
        request_id: RequestId,
        result_data: Vec<u8>,
        confidence_score: u8,
    ) -> Result<ResponseReceipt, LedgerError> {
        self.execute("submit_response", |l| l.submit_response(oracle, request_id, result_data, confidence_score)).await
    }

    /// See [`Ledger::submit_responses`]. The whole batch runs under one lock.
    pub async fn submit_responses(
        &self,
        oracle: AccountId,
        responses: Vec<OracleResponse>,
    ) -> Vec<Result<ResponseReceipt, LedgerError>> {
        self.apply(|l| l.submit_responses(oracle, responses)).await
    }

    /// See [`Ledger::expire_requests`].
    pub async fn expire_requests(&self) -> Vec<RequestId> {
        self.apply(|l| l.expire_requests()).await
    }

    /// Periodically expire overdue oracle requests.
    ///
    /// The task runs until aborted.
    pub fn spawn_expiry_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            info!(period_ms = period.as_millis() as u64, "Expiry sweeper started");

            loop {
                ticker.tick().await;
                let expired = engine.expire_requests().await;
                if !expired.is_empty() {
                    debug!(?expired, "Sweeper expired requests");
                }
            }
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Global registry.
    pub async fn registry(&self) -> Result<GlobalRegistry, LedgerError> {
        self.read(|l| l.registry().cloned()).await
    }

    /// Hunt by id.
    pub async fn hunt(&self, hunt_id: HuntId) -> Result<TreasureHunt, LedgerError> {
        self.read(|l| l.hunt(hunt_id).cloned()).await
    }

    /// Treasure by id.
    pub async fn treasure(&self, treasure_id: TreasureId) -> Result<Treasure, LedgerError> {
        self.read(|l| l.treasure(treasure_id).cloned()).await
    }

    /// Player record.
    pub async fn player(&self, player: AccountId) -> Result<PlayerStats, LedgerError> {
        self.read(|l| l.player(&player).cloned()).await
    }

    /// Reward pool of `owner`.
    pub async fn pool(&self, owner: AccountId) -> Result<RewardPool, LedgerError> {
        self.read(|l| l.pool(&owner).cloned()).await
    }

    /// Oracle registry.
    pub async fn oracle_registry(&self) -> Result<OracleRegistry, LedgerError> {
        self.read(|l| l.oracle_registry().cloned()).await
    }

    /// Oracle request by id.
    pub async fn request(&self, request_id: RequestId) -> Result<OracleRequest, LedgerError> {
        self.read(|l| l.request(request_id).cloned()).await
    }

    /// Requests still awaiting a response.
    pub async fn active_requests(&self) -> Vec<OracleRequest> {
        self.read(|l| l.active_requests().into_iter().cloned().collect()).await
    }

    /// Hash of the current state.
    pub async fn state_hash(&self) -> StateHash {
        self.read(|l| l.compute_hash()).await
    }

    /// Consistent snapshot of the current state.
    pub async fn snapshot(&self) -> Snapshot {
        self.read(Snapshot::capture).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::core::clock::ManualClock;
    use crate::ledger::events::EventData;

    const NOW: u64 = 1_700_000_000;
    const SALT: [u8; 32] = [7; 32];

    fn admin() -> AccountId {
        AccountId::new([0xad; 16])
    }

    fn creator() -> AccountId {
        AccountId::new([0xc0; 16])
    }

    async fn engine_with_clock() -> (LedgerEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        let ledger = Ledger::new(LedgerConfig::with_admin(admin())).with_clock(clock.clone());
        let engine = LedgerEngine::new(ledger);
        engine.initialize(admin()).await.unwrap();
        engine.initialize_oracles(admin()).await.unwrap();
        (engine, clock)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_settle_once() {
        let (engine, _clock) = engine_with_clock().await;
        let hunt_id = engine.create_hunt(creator(), "Race", "", 1_000).await.unwrap();
        let treasure_id = engine
            .add_treasure(creator(), hunt_id, LocationCommitment::commit(b"spot", &SALT), 500, "", 1)
            .await
            .unwrap();

        let handles: Vec<_> = (1..=16u8)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let proof = LocationProof::new(b"spot".to_vec(), SALT, NOW);
                    engine.claim(AccountId::new([i; 16]), treasure_id, proof, 100).await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(receipt) => {
                    winners += 1;
                    assert_eq!(receipt.reward_amount, 500);
                }
                Err(e) => assert_eq!(e, LedgerError::AlreadyClaimed(treasure_id)),
            }
        }
        assert_eq!(winners, 1);

        let hunt = engine.hunt(hunt_id).await.unwrap();
        assert_eq!(hunt.claimed_treasures, 1);
        assert_eq!(engine.registry().await.unwrap().total_rewards_distributed, 500);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creation_allocates_unique_ids() {
        let (engine, _clock) = engine_with_clock().await;

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.create_hunt(creator(), format!("Hunt {}", i), "", 10).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=32).collect::<Vec<_>>());
        assert_eq!(engine.registry().await.unwrap().hunt_count, 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_treasures_allocate_unique_ids() {
        let (engine, _clock) = engine_with_clock().await;
        let hunt_id = engine.create_hunt(creator(), "Crowded", "", 32 * 10).await.unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let commitment = LocationCommitment::commit(format!("cell-{}", i).as_bytes(), &SALT);
                    engine.add_treasure(creator(), hunt_id, commitment, 10, "", 1).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=32).collect::<Vec<_>>());
        assert_eq!(engine.registry().await.unwrap().treasure_count, 32);

        let hunt = engine.hunt(hunt_id).await.unwrap();
        assert_eq!(hunt.total_treasures, 32);
        assert_eq!(hunt.remaining_rewards, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_allocate_unique_ids() {
        let (engine, _clock) = engine_with_clock().await;

        let handles: Vec<_> = (0..32u8)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.create_request(creator(), RequestType::Clue, vec![i], None).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=32).collect::<Vec<_>>());
        assert_eq!(engine.oracle_registry().await.unwrap().request_count, 32);
        assert_eq!(engine.active_requests().await.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_pool_updates_are_atomic() {
        let (engine, _clock) = engine_with_clock().await;
        let owner = creator();
        engine.initialize_pool(owner, 0).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.add_funds(owner, 10).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(engine.pool(owner).await.unwrap().total_funds, 500);
    }

    #[tokio::test]
    async fn test_subscribers_see_events_in_order() {
        let (engine, _clock) = engine_with_clock().await;
        let mut events = engine.subscribe();

        let hunt_id = engine.create_hunt(creator(), "Feed", "", 100).await.unwrap();
        engine
            .add_treasure(creator(), hunt_id, LocationCommitment::commit(b"x", &SALT), 10, "", 1)
            .await
            .unwrap();
        // Rejected operations publish nothing
        assert!(engine.deactivate_hunt(admin(), hunt_id).await.is_err());
        engine.deactivate_hunt(creator(), hunt_id).await.unwrap();

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        let third = events.recv().await.unwrap();
        assert_eq!(first.data.kind(), "hunt_created");
        assert_eq!(second.data.kind(), "treasure_added");
        assert_eq!(third.data, EventData::HuntDeactivated { hunt_id });
        assert!(first.sequence < second.sequence && second.sequence < third.sequence);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_oracle_round_trip_through_engine() {
        let (engine, _clock) = engine_with_clock().await;
        let oracle = AccountId::new([0x0a; 16]);
        engine.authorize_oracle(admin(), oracle).await.unwrap();

        let id = engine.create_request(creator(), RequestType::Verification, vec![1, 2], None).await.unwrap();
        assert_eq!(engine.active_requests().await.len(), 1);

        let results = engine.submit_responses(oracle, vec![
            OracleResponse { request_id: id, result_data: vec![9], confidence_score: 80 },
        ]).await;
        assert!(results[0].is_ok());
        assert!(engine.active_requests().await.is_empty());
        assert_eq!(engine.request(id).await.unwrap().confidence_score, Some(80));
        engine.heartbeat(oracle).await.unwrap();
    }

    #[tokio::test]
    async fn test_expiry_sweeper() {
        let (engine, clock) = engine_with_clock().await;
        let id = engine.create_request(creator(), RequestType::Clue, vec![], None).await.unwrap();
        clock.advance(3_600);

        let sweeper = engine.spawn_expiry_sweeper(Duration::from_millis(10));
        let mut expired = false;
        for _ in 0..100 {
            if engine.active_requests().await.is_empty() {
                expired = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sweeper.abort();

        assert!(expired);
        assert_eq!(
            engine.request(id).await.unwrap().status,
            crate::oracle::request::RequestStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_snapshot_matches_state_hash() {
        let (engine, _clock) = engine_with_clock().await;
        engine.create_hunt(creator(), "Snap", "", 1).await.unwrap();

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.state_hash, engine.state_hash().await);
    }
}
