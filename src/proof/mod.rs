//! Location Proof System
//!
//! Treasures carry a salted hash commitment to their location; claims
//! open it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commitment.rs   - Location commitment and its opening      │
//! │  verify.rs       - Pluggable verifier contract              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod verify;

// Re-export key types
pub use commitment::{LocationCommitment, LocationProof};
pub use verify::{ProofVerifier, HashCommitmentVerifier, FixedVerifier};
