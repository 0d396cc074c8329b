//! Location Commitment Protocol
//!
//! A creator commits to a secret location when hiding a treasure.
//! The claimer opens the commitment with the location and salt.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use crate::core::hash::{StateHash, hash_with_domain};

/// Domain separator for location commitments.
const COMMITMENT_DOMAIN: &[u8] = b"TREASURE_LOCATION_V1";

/// Domain separator for proof digests (replay tracking).
const PROOF_DIGEST_DOMAIN: &[u8] = b"TREASURE_PROOF_V1";

/// Commitment to a secret treasure location.
///
/// Immutable once stored on a treasure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationCommitment(pub StateHash);

impl LocationCommitment {
    /// Commit to an encoded location with a secret salt.
    ///
    /// The location encoding (geohash, cell id, QR payload) is opaque here.
    pub fn commit(location: &[u8], salt: &[u8; 32]) -> Self {
        Self(compute_commitment_hash(location, salt))
    }

    /// Raw commitment bytes.
    pub fn as_bytes(&self) -> &StateHash {
        &self.0
    }

    /// Check whether `proof` opens this commitment.
    pub fn opens_with(&self, proof: &LocationProof) -> bool {
        compute_commitment_hash(&proof.location, &proof.salt) == self.0
    }
}

/// Compute commitment hash from location and salt.
fn compute_commitment_hash(location: &[u8], salt: &[u8; 32]) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(COMMITMENT_DOMAIN);
    hasher.update((location.len() as u64).to_le_bytes());
    hasher.update(location);
    hasher.update(salt);
    hasher.finalize().into()
}

/// Opening of a location commitment, submitted with a claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationProof {
    /// Encoded location the player observed.
    pub location: Vec<u8>,

    /// Salt revealed to the finder at the location (QR code, NFC tag).
    pub salt: [u8; 32],

    /// Unix time the proof was produced (freshness window).
    pub issued_at: u64,
}

impl LocationProof {
    /// Create a new proof.
    pub fn new(location: impl Into<Vec<u8>>, salt: [u8; 32], issued_at: u64) -> Self {
        Self {
            location: location.into(),
            salt,
            issued_at,
        }
    }

    /// Digest of the opening (location and salt), used for replay rejection.
    ///
    /// `issued_at` is caller-chosen and unsigned, so it is left out: the
    /// same opening with a different timestamp is the same proof.
    pub fn digest(&self) -> StateHash {
        let mut data = Vec::with_capacity(self.location.len() + 40);
        data.extend_from_slice(&(self.location.len() as u64).to_le_bytes());
        data.extend_from_slice(&self.location);
        data.extend_from_slice(&self.salt);
        hash_with_domain(PROOF_DIGEST_DOMAIN, &data)
    }
}
