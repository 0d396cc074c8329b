//! Entity Identifiers
//!
//! Principals are opaque 16-byte ids; hunts, treasures and oracle
//! requests are addressed by monotonic integers handed out by the
//! global registry.

use std::fmt;

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Hunt identifier (allocated from the global hunt counter).
pub type HuntId = u64;

/// Treasure identifier (allocated from the global treasure counter).
pub type TreasureId = u64;

/// Oracle request identifier (allocated from the oracle request counter).
pub type RequestId = u64;

/// Opaque principal identifier (player, creator, admin or oracle node).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct AccountId(pub [u8; 16]);

impl AccountId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Derive a stable id from an arbitrary label (wallet address, handle).
    ///
    /// SHA-256 of the domain-separated label, truncated to 16 bytes.
    pub fn derive(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"treasure-ledger-account:");
        hasher.update(label.as_bytes());
        let hash = hasher.finalize();

        let mut id = [0u8; 16];
        id.copy_from_slice(&hash[..16]);
        Self(id)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
