//! Ledger Snapshots
//!
//! Binary (bincode) dumps of the persistent ledger state, stamped with
//! the state hash so a corrupted or tampered dump is refused on restore.

use std::sync::Arc;

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::config::LedgerConfig;
use crate::core::clock::Clock;
use crate::core::hash::StateHash;
use crate::ledger::state::{Ledger, LedgerState};
use crate::proof::verify::ProofVerifier;

/// Current snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Encoding or decoding failed.
    #[error("Snapshot codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Snapshot written by an incompatible format.
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    /// State does not match the stamped hash.
    #[error("State hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Hash stored in the snapshot (hex).
        expected: String,
        /// Hash of the decoded state (hex).
        actual: String,
    },
}

/// Point-in-time copy of the ledger state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Unix time of capture.
    pub taken_at: u64,
    /// `Ledger::compute_hash` at capture time.
    pub state_hash: StateHash,
    /// The state itself.
    pub state: LedgerState,
}

impl Snapshot {
    /// Copy the ledger's persistent state.
    pub fn capture(ledger: &Ledger) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            taken_at: ledger.now(),
            state_hash: ledger.compute_hash(),
            state: ledger.state().clone(),
        }
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        Ok(bincode::deserialize(data)?)
    }

    /// Rebuild a ledger, refusing state that does not hash to the stamp.
    pub fn restore(
        self,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Result<Ledger, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }

        let ledger = Ledger::from_state(config, self.state, clock, verifier);
        let actual = ledger.compute_hash();
        if actual != self.state_hash {
            return Err(SnapshotError::HashMismatch {
                expected: hex::encode(self.state_hash),
                actual: hex::encode(actual),
            });
        }

        info!(
            state_hash = %hex::encode(&actual[..8]),
            hunts = ledger.state().hunts.len(),
            players = ledger.state().players.len(),
            "Ledger restored from snapshot"
        );
        Ok(ledger)
    }
}
