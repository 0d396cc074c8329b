//! Ledger Events
//!
//! Every committed mutation emits one or more events for external
//! indexers and notification services. Rejected operations emit none.

use serde::{Serialize, Deserialize};

use crate::core::ids::{AccountId, HuntId, TreasureId, RequestId};
use crate::oracle::request::RequestType;

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    /// Global registry initialized.
    RegistryInitialized {
        admin: AccountId,
        fee_percentage: u8,
    },

    /// Admin changed the fee rate.
    FeeUpdated {
        old_percentage: u8,
        new_percentage: u8,
    },

    /// A creator opened a hunt.
    HuntCreated {
        hunt_id: HuntId,
        creator: AccountId,
        title: String,
        reward_pool: u64,
    },

    /// A creator closed a hunt to new treasures and claims.
    HuntDeactivated {
        hunt_id: HuntId,
    },

    /// A treasure was hidden.
    TreasureAdded {
        hunt_id: HuntId,
        treasure_id: TreasureId,
        reward_amount: u64,
        difficulty_level: u8,
    },

    /// First registration of a player.
    PlayerRegistered {
        player: AccountId,
    },

    /// A treasure was claimed.
    TreasureClaimed {
        hunt_id: HuntId,
        treasure_id: TreasureId,
        claimer: AccountId,
        amount: u64,
        trust_score: u8,
    },

    /// Admin overwrote a trust score.
    TrustScoreUpdated {
        player: AccountId,
        old_score: u8,
        new_score: u8,
    },

    /// An owner opened a reward pool.
    PoolInitialized {
        owner: AccountId,
        initial_funds: u64,
    },

    /// Funds added to a pool.
    FundsAdded {
        owner: AccountId,
        amount: u64,
        total_funds: u64,
    },

    /// A reward was reserved for a player.
    PendingRewardCreated {
        owner: AccountId,
        player: AccountId,
        treasure_id: TreasureId,
        amount: u64,
    },

    /// A pending reward was paid out.
    RewardDistributed {
        owner: AccountId,
        player: AccountId,
        treasure_id: TreasureId,
        amount: u64,
        distributed_funds: u64,
    },

    /// Oracle registry initialized.
    OracleRegistryInitialized {
        admin: AccountId,
    },

    /// Oracle added to the authorized set.
    OracleAuthorized {
        oracle: AccountId,
    },

    /// Oracle removed from the authorized set.
    OracleRevoked {
        oracle: AccountId,
    },

    /// Oracle request opened.
    RequestCreated {
        request_id: RequestId,
        request_type: RequestType,
        requester: AccountId,
        treasure_id: Option<TreasureId>,
        expires_at: u64,
    },

    /// Oracle answered a request.
    ResponseSubmitted {
        request_id: RequestId,
        oracle: AccountId,
        confidence_score: u8,
        /// Hex SHA-256 over (request id, result, oracle).
        response_digest: String,
        /// Seconds between request creation and response.
        processing_secs: u64,
        result_len: usize,
    },

    /// Request passed its deadline without a response.
    RequestExpired {
        request_id: RequestId,
    },

    /// Oracle liveness ping.
    OracleHeartbeat {
        oracle: AccountId,
    },
}

impl EventData {
    /// Short event name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegistryInitialized { .. } => "registry_initialized",
            Self::FeeUpdated { .. } => "fee_updated",
            Self::HuntCreated { .. } => "hunt_created",
            Self::HuntDeactivated { .. } => "hunt_deactivated",
            Self::TreasureAdded { .. } => "treasure_added",
            Self::PlayerRegistered { .. } => "player_registered",
            Self::TreasureClaimed { .. } => "treasure_claimed",
            Self::TrustScoreUpdated { .. } => "trust_score_updated",
            Self::PoolInitialized { .. } => "pool_initialized",
            Self::FundsAdded { .. } => "funds_added",
            Self::PendingRewardCreated { .. } => "pending_reward_created",
            Self::RewardDistributed { .. } => "reward_distributed",
            Self::OracleRegistryInitialized { .. } => "oracle_registry_initialized",
            Self::OracleAuthorized { .. } => "oracle_authorized",
            Self::OracleRevoked { .. } => "oracle_revoked",
            Self::RequestCreated { .. } => "request_created",
            Self::ResponseSubmitted { .. } => "response_submitted",
            Self::RequestExpired { .. } => "request_expired",
            Self::OracleHeartbeat { .. } => "oracle_heartbeat",
        }
    }
}

/// A ledger event with ordering and attribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Strictly increasing across the ledger's lifetime.
    pub sequence: u64,

    /// Unix time of the operation.
    pub timestamp: u64,

    /// Principal whose call produced the event.
    pub actor: AccountId,

    /// Event data
    pub data: EventData,
}

impl LedgerEvent {
    /// Serialize for the indexer feed.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse an indexer feed line.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl PartialOrd for LedgerEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LedgerEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then(self.timestamp.cmp(&other.timestamp))
            .then(self.actor.cmp(&other.actor))
            .then_with(|| self.data.kind().cmp(other.data.kind()))
    }
}
