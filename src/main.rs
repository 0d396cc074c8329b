//! Treasure Ledger Demo
//!
//! Runs a short hunt end to end against an in-process ledger engine:
//! hunt setup, a claim race, pool payout, oracle round trip and a
//! snapshot restore.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use treasure_ledger::{
    core::hash::hash_with_domain,
    proof::HashCommitmentVerifier,
    AccountId, Ledger, LedgerConfig, LedgerEngine, LedgerError, LedgerEvent, LocationCommitment,
    LocationProof, RequestType, Snapshot, SystemClock, VERSION,
};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Treasure Ledger v{}", VERSION);

    let config = LedgerConfig::from_env();
    let admin = config.admin;
    info!(admin = %admin, min_claim_trust = config.min_claim_trust, "Configuration loaded");

    let engine = LedgerEngine::new(Ledger::new(config.clone()));
    let sweeper = engine.spawn_expiry_sweeper(SWEEP_INTERVAL);

    let indexer = spawn_indexer(engine.subscribe());

    run_demo(&engine, admin).await?;

    // Snapshot round trip
    let snapshot = engine.snapshot().await;
    let bytes = snapshot.to_bytes()?;
    let restored = Snapshot::from_bytes(&bytes)?
        .restore(config, Arc::new(SystemClock), Arc::new(HashCommitmentVerifier))
        .context("snapshot restore failed")?;
    info!(
        bytes = bytes.len(),
        state_hash = %hex::encode(restored.compute_hash()),
        "Snapshot verified"
    );

    sweeper.abort();
    drop(engine);
    let seen = indexer.await?;
    info!("Indexer received {} events", seen);
    Ok(())
}

/// Log every ledger event as JSON until the feed closes. Returns the
/// number of events seen.
fn spawn_indexer(mut feed: broadcast::Receiver<LedgerEvent>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut seen = 0u64;
        loop {
            let event = match feed.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Indexer lagged, {} events skipped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            seen += 1;
            match event.to_json() {
                Ok(json) => info!(target: "indexer", "{}", json),
                Err(e) => warn!("Failed to encode event {}: {}", event.sequence, e),
            }
        }
        seen
    })
}

async fn run_demo(engine: &LedgerEngine, admin: AccountId) -> anyhow::Result<()> {
    let creator = AccountId::derive("creator");
    let alice = AccountId::derive("alice");
    let bob = AccountId::derive("bob");
    let oracle = AccountId::derive("anti-cheat-oracle");

    info!("=== Setup ===");
    engine.initialize(admin).await?;
    engine.initialize_oracles(admin).await?;
    engine.initialize_pool(creator, 1_000_000).await?;

    let hunt_id = engine.create_hunt(creator, "Old Town", "Five coins under the bridges", 1_000_000).await?;
    let location = b"u33dc0cpke7v".to_vec();
    let salt = hash_with_domain(b"DEMO_SALT", b"old-town-1");
    let treasure_id = engine
        .add_treasure(creator, hunt_id, LocationCommitment::commit(&location, &salt), 100_000, "ipfs://demo/1", 2)
        .await?;

    let hunt = engine.hunt(hunt_id).await?;
    info!(hunt_id, treasure_id, remaining = hunt.remaining_rewards, "Treasure hidden");

    info!("=== Claim race ===");
    let now = engine.read(|l| l.now()).await;
    let proof = LocationProof::new(location, salt, now);
    let (a, b) = tokio::join!(
        engine.claim(alice, treasure_id, proof.clone(), 92),
        engine.claim(bob, treasure_id, proof, 88),
    );
    let winner = match (a, b) {
        (Ok(receipt), Err(LedgerError::AlreadyClaimed(_))) => {
            info!(reward = receipt.reward_amount, "Alice won");
            alice
        }
        (Err(LedgerError::AlreadyClaimed(_)), Ok(receipt)) => {
            info!(reward = receipt.reward_amount, "Bob won");
            bob
        }
        (a, b) => bail!("claim race settled incorrectly: {:?} / {:?}", a, b),
    };

    let paid = engine.distribute_reward(creator, winner, treasure_id).await?;
    let pool = engine.pool(creator).await?;
    info!(paid, distributed = pool.distributed_funds, total = pool.total_funds, "Reward paid from pool");

    info!("=== Oracle ===");
    engine.authorize_oracle(admin, oracle).await?;
    let request_id = engine
        .create_request(winner, RequestType::Verification, b"claim-review".to_vec(), Some(treasure_id))
        .await?;
    let receipt = engine.submit_response(oracle, request_id, b"consistent".to_vec(), 97).await?;
    info!(request_id, digest = %hex::encode(&receipt.digest[..8]), "Oracle answered");

    let intruder = AccountId::derive("intruder");
    if let Err(e) = engine.submit_response(intruder, request_id, vec![], 100).await {
        info!("Intruder rejected: {}", e);
    }

    let registry = engine.registry().await?;
    info!(
        hunts = registry.hunt_count,
        treasures = registry.treasure_count,
        players = registry.total_players,
        distributed = registry.total_rewards_distributed,
        "Final registry"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_indexer_keeps_reading_after_lag() {
        let admin = AccountId::derive("admin");
        let config = LedgerConfig {
            event_capacity: 2,
            ..LedgerConfig::with_admin(admin)
        };
        let engine = LedgerEngine::new(Ledger::new(config));
        let feed = engine.subscribe();

        engine.initialize(admin).await.unwrap();
        for i in 0..5 {
            engine.create_hunt(admin, format!("Hunt {}", i), "", 10).await.unwrap();
        }

        // Six events into a channel of two: the indexer lags first, then
        // drains what is retained instead of stopping.
        let indexer = spawn_indexer(feed);
        drop(engine);
        assert_eq!(indexer.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_demo_claim_race_has_one_winner() {
        let admin = AccountId::derive("admin");
        let engine = LedgerEngine::new(Ledger::new(LedgerConfig::with_admin(admin)));
        run_demo(&engine, admin).await.unwrap();

        let registry = engine.registry().await.unwrap();
        assert_eq!(registry.treasure_count, 1);
        assert_eq!(registry.total_players, 1);
        assert_eq!(registry.total_rewards_distributed, 100_000);
    }
}
