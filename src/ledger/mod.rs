//! Ledger Module
//!
//! Hunts, treasures, players, reward pools and the claim protocol.
//! Every operation validates fully before it mutates.
//!
//! ## Module Structure
//!
//! - `state`: The `Ledger` world object and its persistent data
//! - `registry`: Global counters, id allocation, fee rate
//! - `hunt`: Hunt and treasure lifecycle
//! - `player`: Player directory and trust scores
//! - `reward_pool`: Per-owner fund accounting and payouts
//! - `claim`: Atomic claim settlement
//! - `guard`: Role checks
//! - `events`: Events emitted by committed operations
//! - `error`: Error taxonomy

pub mod error;
pub mod guard;
pub mod events;
pub mod state;
pub mod registry;
pub mod hunt;
pub mod player;
pub mod reward_pool;
pub mod claim;

// Re-export key types
pub use error::{Component, Entity, LedgerError, ProofRejection};
pub use guard::Role;
pub use events::{EventData, LedgerEvent};
pub use state::{Ledger, LedgerState};
pub use registry::{GlobalRegistry, DEFAULT_FEE_PERCENTAGE};
pub use hunt::{Treasure, TreasureHunt, MAX_DIFFICULTY, MIN_DIFFICULTY};
pub use player::{PlayerStats, Registration, TrustTier, DEFAULT_TRUST_SCORE, MAX_TRUST_SCORE};
pub use reward_pool::{PendingReward, RewardPool};
pub use claim::ClaimReceipt;
