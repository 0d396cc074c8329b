//! # Treasure Ledger
//!
//! Authoritative state for location-based treasure hunts: hunts,
//! treasures, player standing, reward pools and AI-oracle requests.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TREASURE LEDGER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                               │
//! │  ├── ids.rs      - Account ids, hunt/treasure/request ids   │
//! │  ├── hash.rs     - State hashing for verification           │
//! │  └── clock.rs    - Injected time source                     │
//! │                                                             │
//! │  proof/          - Location commitments                     │
//! │  ├── commitment.rs - Salted location commitment / opening   │
//! │  └── verify.rs   - Pluggable verifier                       │
//! │                                                             │
//! │  ledger/         - Transactional core (synchronous)         │
//! │  ├── state.rs    - Ledger world object                      │
//! │  ├── registry.rs - Global counters and fee                  │
//! │  ├── hunt.rs     - Hunts and treasures                      │
//! │  ├── player.rs   - Player directory and trust               │
//! │  ├── reward_pool.rs - Fund accounting                       │
//! │  └── claim.rs    - Atomic claim settlement                  │
//! │                                                             │
//! │  oracle/         - Oracle coordination                      │
//! │  ├── registry.rs - Authorized oracle set                    │
//! │  └── request.rs  - Requests, responses, expiry              │
//! │                                                             │
//! │  engine.rs       - Async serialization + event broadcast    │
//! │  snapshot.rs     - Binary state snapshots                   │
//! │  config.rs       - Environment configuration                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity Guarantee
//!
//! Every `Ledger` operation checks all of its preconditions before it
//! writes anything. A rejected operation returns a typed
//! [`LedgerError`] and leaves the state (and its hash) untouched.
//!
//! The `Ledger` itself is single-threaded. [`LedgerEngine`] puts it
//! behind one async write lock, giving concurrent callers a total order:
//! two claims on the same treasure can never both see it unclaimed, and
//! counters never skip or repeat an id.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod proof;
pub mod ledger;
pub mod oracle;
pub mod engine;
pub mod snapshot;
pub mod config;

// Re-export commonly used types
pub use crate::core::ids::{AccountId, HuntId, TreasureId, RequestId};
pub use crate::core::clock::{Clock, SystemClock, ManualClock};
pub use config::LedgerConfig;
pub use engine::LedgerEngine;
pub use ledger::{Ledger, LedgerError, LedgerEvent, EventData, ClaimReceipt};
pub use oracle::{RequestType, RequestStatus};
pub use proof::{LocationCommitment, LocationProof};
pub use snapshot::Snapshot;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
