//! Verification API
//!
//! The ledger only enforces the accept/reject outcome of a verifier.
//! Anything smarter (GPS heuristics, photo or QR checks) plugs in
//! behind `ProofVerifier`.

use crate::proof::commitment::{LocationCommitment, LocationProof};

/// Decides whether a location proof opens a treasure's commitment.
///
/// Implementations must be pure: same inputs, same answer.
pub trait ProofVerifier: Send + Sync {
    /// Verify `proof` against `commitment`.
    fn verify(&self, commitment: &LocationCommitment, proof: &LocationProof) -> bool;
}

/// Opens a salted hash commitment and checks for exact equality.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashCommitmentVerifier;

impl ProofVerifier for HashCommitmentVerifier {
    fn verify(&self, commitment: &LocationCommitment, proof: &LocationProof) -> bool {
        if proof.location.is_empty() {
            return false;
        }
        commitment.opens_with(proof)
    }
}

/// Verifier with a fixed answer, for exercising the settlement path.
#[derive(Debug, Clone, Copy)]
pub struct FixedVerifier(pub bool);

impl ProofVerifier for FixedVerifier {
    fn verify(&self, _commitment: &LocationCommitment, _proof: &LocationProof) -> bool {
        self.0
    }
}

// =============================================================================
// TESTS
// =============================================================================
