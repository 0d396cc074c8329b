//! Oracle Requests
//!
//! Requests are opened by anyone and answered later by an authorized
//! oracle, correlated by id. A request leaves the active set exactly
//! once: by a response (`Completed`) or by passing its deadline
//! (`Failed`).

use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::core::hash::{StateHash, StateHasher};
use crate::core::ids::{AccountId, RequestId, TreasureId};
use crate::ledger::error::{Entity, LedgerError};
use crate::ledger::events::EventData;
use crate::ledger::guard::Role;
use crate::ledger::state::Ledger;

/// Domain separator for response digests.
const RESPONSE_DOMAIN: &[u8] = b"TREASURE_ORACLE_RESPONSE_V1";

/// Highest accepted confidence score.
pub const MAX_CONFIDENCE: u8 = 100;

/// What the requester wants from the oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Generate a clue for a treasure.
    Clue,
    /// Verify a claim or location.
    Verification,
    /// Evaluate a reward.
    Reward,
    /// Analyze player behavior.
    Analysis,
}

impl RequestType {
    fn as_u8(self) -> u8 {
        match self {
            Self::Clue => 0,
            Self::Verification => 1,
            Self::Reward => 2,
            Self::Analysis => 3,
        }
    }
}

/// Request lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Waiting for a response.
    Pending,
    /// An oracle answered.
    Completed,
    /// Deadline passed without an answer.
    Failed,
}

impl RequestStatus {
    fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Completed => 1,
            Self::Failed => 2,
        }
    }
}

/// One oracle request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Request identifier
    pub request_id: RequestId,
    /// What is being asked.
    pub request_type: RequestType,
    /// Principal that opened the request.
    pub requester: AccountId,
    /// Opaque request payload.
    pub input_data: Vec<u8>,
    /// Lifecycle state.
    pub status: RequestStatus,
    /// Unix time of creation.
    pub created_at: u64,
    /// Pending requests past this time are expired by the sweeper.
    pub expires_at: u64,
    /// Unix time of the response or expiry.
    pub completed_at: Option<u64>,
    /// Opaque oracle answer.
    pub result_data: Option<Vec<u8>>,
    /// Treasure the request concerns (looked up by id only, never checked).
    pub treasure_id: Option<TreasureId>,
    /// Oracle that answered.
    pub responder: Option<AccountId>,
    /// Oracle confidence, 0..=100.
    pub confidence_score: Option<u8>,
    /// Audit digest over (request id, result, oracle).
    pub response_digest: Option<StateHash>,
}

impl OracleRequest {
    /// Still awaiting a response and inside its deadline?
    pub fn is_open_at(&self, now: u64) -> bool {
        self.status == RequestStatus::Pending && now < self.expires_at
    }

    /// Hash this request for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.request_id);
        hasher.update_u8(self.request_type.as_u8());
        hasher.update_account(&self.requester);
        hasher.update_prefixed(&self.input_data);
        hasher.update_u8(self.status.as_u8());
        hasher.update_u64(self.created_at);
        hasher.update_u64(self.expires_at);
        hasher.update_opt_u64(self.completed_at);
        match &self.result_data {
            Some(result) => {
                hasher.update_u8(1);
                hasher.update_prefixed(result);
            }
            None => hasher.update_u8(0),
        }
        hasher.update_opt_u64(self.treasure_id);
        match &self.responder {
            Some(responder) => {
                hasher.update_u8(1);
                hasher.update_account(responder);
            }
            None => hasher.update_u8(0),
        }
        hasher.update_opt_u64(self.confidence_score.map(u64::from));
        match &self.response_digest {
            Some(digest) => {
                hasher.update_u8(1);
                hasher.update_bytes(digest);
            }
            None => hasher.update_u8(0),
        }
    }
}

/// One item of a batch submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResponse {
    /// Request being answered.
    pub request_id: RequestId,
    /// Opaque oracle answer.
    pub result_data: Vec<u8>,
    /// Oracle confidence, 0..=100.
    pub confidence_score: u8,
}

/// Result of an accepted response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseReceipt {
    /// Answered request.
    pub request_id: RequestId,
    /// Audit digest over (request id, result, oracle).
    pub digest: StateHash,
    /// Seconds between request creation and the response.
    pub processing_secs: u64,
}

/// Digest binding a response to its request and responder.
pub fn response_digest(request_id: RequestId, result_data: &[u8], oracle: &AccountId) -> StateHash {
    let mut hasher = StateHasher::new(RESPONSE_DOMAIN);
    hasher.update_u64(request_id);
    hasher.update_prefixed(result_data);
    hasher.update_account(oracle);
    hasher.finalize()
}

impl Ledger {
    /// Open a request. Any caller may do this.
    pub fn create_request(
        &mut self,
        requester: AccountId,
        request_type: RequestType,
        input_data: Vec<u8>,
        treasure_id: Option<TreasureId>,
    ) -> Result<RequestId, LedgerError> {
        let now = self.now();
        let request_id = self.oracle_registry()?.next_request_id()?;
        let expires_at = now.checked_add(self.config().request_ttl_secs)
            .ok_or_else(|| LedgerError::overflow("expires_at"))?;

        let registry = self.oracle_registry_mut()?;
        registry.request_count = request_id;
        registry.active_request_ids.insert(request_id);
        self.state.requests.insert(request_id, OracleRequest {
            request_id,
            request_type,
            requester,
            input_data,
            status: RequestStatus::Pending,
            created_at: now,
            expires_at,
            completed_at: None,
            result_data: None,
            treasure_id,
            responder: None,
            confidence_score: None,
            response_digest: None,
        });

        debug!(request_id, ?request_type, requester = %requester.short(), expires_at, "Oracle request created");
        self.push_event(requester, EventData::RequestCreated {
            request_id,
            request_type,
            requester,
            treasure_id,
            expires_at,
        });
        Ok(request_id)
    }

    /// Answer an active request.
    pub fn submit_response(
        &mut self,
        oracle: AccountId,
        request_id: RequestId,
        result_data: Vec<u8>,
        confidence_score: u8,
    ) -> Result<ResponseReceipt, LedgerError> {
        let now = self.now();
        let registry = self.oracle_registry()?;
        self.authorize(&oracle, Role::Oracle)?;
        if confidence_score > MAX_CONFIDENCE {
            return Err(LedgerError::InvalidArgument(format!(
                "confidence {} exceeds {}", confidence_score, MAX_CONFIDENCE
            )));
        }
        let request = self.state.requests.get(&request_id)
            .filter(|r| registry.active_request_ids.contains(&r.request_id) && r.is_open_at(now))
            .ok_or(LedgerError::NotFound(Entity::Request(request_id)))?;

        let digest = response_digest(request_id, &result_data, &oracle);
        let processing_secs = now.saturating_sub(request.created_at);
        let result_len = result_data.len();

        self.oracle_registry_mut()?.active_request_ids.remove(&request_id);
        if let Some(request) = self.state.requests.get_mut(&request_id) {
            request.status = RequestStatus::Completed;
            request.completed_at = Some(now);
            request.result_data = Some(result_data);
            request.responder = Some(oracle);
            request.confidence_score = Some(confidence_score);
            request.response_digest = Some(digest);
        }

        info!(
            request_id, oracle = %oracle.short(), confidence_score, processing_secs,
            "Oracle response accepted"
        );
        self.push_event(oracle, EventData::ResponseSubmitted {
            request_id,
            oracle,
            confidence_score,
            response_digest: hex::encode(digest),
            processing_secs,
            result_len,
        });
        Ok(ResponseReceipt { request_id, digest, processing_secs })
    }

    /// Answer several requests. Each item succeeds or fails on its own.
    pub fn submit_responses(
        &mut self,
        oracle: AccountId,
        responses: Vec<OracleResponse>,
    ) -> Vec<Result<ResponseReceipt, LedgerError>> {
        let results: Vec<_> = responses.into_iter()
            .map(|r| self.submit_response(oracle, r.request_id, r.result_data, r.confidence_score))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(oracle = %oracle.short(), failed, total = results.len(), "Batch responses partially rejected");
        }
        results
    }

    /// Fail every pending request whose deadline has passed.
    ///
    /// Returns the expired ids in ascending order. A ledger without an
    /// oracle registry has nothing to expire.
    pub fn expire_requests(&mut self) -> Vec<RequestId> {
        let now = self.now();
        let Some(registry) = self.state.oracles.as_mut() else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        for id in registry.active_request_ids.iter().copied() {
            let Some(request) = self.state.requests.get_mut(&id) else {
                continue;
            };
            if now >= request.expires_at {
                request.status = RequestStatus::Failed;
                request.completed_at = Some(now);
                expired.push((id, request.requester));
            }
        }
        for (id, _) in &expired {
            registry.active_request_ids.remove(id);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Oracle requests expired");
        }
        expired.into_iter()
            .map(|(request_id, requester)| {
                self.push_event(requester, EventData::RequestExpired { request_id });
                request_id
            })
            .collect()
    }

    /// Get a request.
    pub fn request(&self, request_id: RequestId) -> Result<&OracleRequest, LedgerError> {
        self.state.requests.get(&request_id)
            .ok_or(LedgerError::NotFound(Entity::Request(request_id)))
    }

    /// Requests still in the active set, by id.
    pub fn active_requests(&self) -> Vec<&OracleRequest> {
        let Some(registry) = self.state.oracles.as_ref() else {
            return Vec::new();
        };
        registry.active_request_ids.iter()
            .filter_map(|id| self.state.requests.get(id))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
