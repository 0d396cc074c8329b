//! Ledger Errors
//!
//! Every rejected operation returns one of these and leaves the ledger
//! exactly as it was.

use std::fmt;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::ids::{AccountId, HuntId, TreasureId, RequestId};
use crate::ledger::guard::Role;

/// An addressable ledger entity, named in `NotFound` / `AlreadyExists`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    /// A treasure hunt.
    Hunt(HuntId),
    /// A treasure.
    Treasure(TreasureId),
    /// A player record.
    Player(AccountId),
    /// An owner's reward pool.
    Pool(AccountId),
    /// A queued pending reward.
    PendingReward {
        /// Player the reward is reserved for.
        player: AccountId,
        /// Treasure the reward pays for.
        treasure_id: TreasureId,
    },
    /// An oracle request that is not (or no longer) active.
    Request(RequestId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hunt(id) => write!(f, "hunt {}", id),
            Self::Treasure(id) => write!(f, "treasure {}", id),
            Self::Player(id) => write!(f, "player {}", id.short()),
            Self::Pool(owner) => write!(f, "reward pool of {}", owner.short()),
            Self::PendingReward { player, treasure_id } => {
                write!(f, "pending reward for {} on treasure {}", player.short(), treasure_id)
            }
            Self::Request(id) => write!(f, "oracle request {}", id),
        }
    }
}

/// Singleton components that must be initialized exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    /// The global registry.
    Registry,
    /// The AI oracle registry.
    OracleRegistry,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => write!(f, "global registry"),
            Self::OracleRegistry => write!(f, "oracle registry"),
        }
    }
}

/// Why a location proof was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofRejection {
    /// The verifier did not accept the opening.
    Mismatch,
    /// Issued before the freshness window.
    Stale,
    /// Issued after `now + clock skew`.
    FromFuture,
    /// The exact proof was already used for a claim.
    Replayed,
}

impl fmt::Display for ProofRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch => write!(f, "does not open the location commitment"),
            Self::Stale => write!(f, "too old"),
            Self::FromFuture => write!(f, "issued in the future"),
            Self::Replayed => write!(f, "already used"),
        }
    }
}

/// Ledger operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Caller lacks the role the operation requires.
    #[error("unauthorized: {} is not {role}", .caller.short())]
    Unauthorized {
        /// Principal that attempted the call.
        caller: AccountId,
        /// Role that was required.
        role: Role,
    },

    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(Entity),

    /// Treasure was claimed before.
    #[error("treasure {0} already claimed")]
    AlreadyClaimed(TreasureId),

    /// Entity already exists and cannot be created again.
    #[error("{0} already exists")]
    AlreadyExists(Entity),

    /// Operation would break `distributed <= total` (or `amount <= remaining`).
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount the operation needed.
        requested: u64,
        /// Amount that was available.
        available: u64,
    },

    /// Location proof rejected.
    #[error("invalid location proof: {0}")]
    InvalidProof(ProofRejection),

    /// Singleton initialized twice.
    #[error("{0} already initialized")]
    AlreadyInitialized(Component),

    /// Singleton used before initialization.
    #[error("{0} not initialized")]
    NotInitialized(Component),

    /// Hunt was deactivated by its creator.
    #[error("hunt {0} is not active")]
    HuntInactive(HuntId),

    /// Player's stored trust score is below the claim threshold.
    #[error("trust score {score} below required {required}")]
    TrustTooLow {
        /// Stored trust score.
        score: u8,
        /// Configured minimum.
        required: u8,
    },

    /// Argument out of range (or arithmetic would overflow).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl LedgerError {
    /// Shorthand for arithmetic overflow on a named quantity.
    pub(crate) fn overflow(what: &str) -> Self {
        Self::InvalidArgument(format!("{} overflows", what))
    }
}
