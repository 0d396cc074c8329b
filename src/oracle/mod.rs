//! Oracle Coordination
//!
//! External oracle nodes answer asynchronous requests (clue generation,
//! verification, analysis). The ledger only tracks who may answer,
//! which requests are outstanding, and what came back.
//!
//! ```text
//!   any caller                 authorized oracle
//!       │                             │
//!       ▼                             ▼
//!  create_request ──► Pending ──► submit_response ──► Completed
//!                        │
//!                        └── deadline passed ──► expire_requests ──► Failed
//! ```

pub mod registry;
pub mod request;

pub use registry::OracleRegistry;
pub use request::{
    OracleRequest, OracleResponse, RequestStatus, RequestType, ResponseReceipt,
    response_digest, MAX_CONFIDENCE,
};
