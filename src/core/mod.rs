//! Core deterministic primitives.
//!
//! Identifiers, hashing and the injected clock. Nothing here touches
//! ledger semantics.

pub mod ids;
pub mod hash;
pub mod clock;

// Re-export core types
pub use ids::{AccountId, HuntId, TreasureId, RequestId};
pub use hash::{StateHash, StateHasher, hash_with_domain};
pub use clock::{Clock, SystemClock, ManualClock};
