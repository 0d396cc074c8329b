//! Ledger Configuration
//!
//! Defaults suit tests and the demo binary; deployments override them
//! through `LEDGER_*` environment variables.

use crate::core::ids::AccountId;

/// Minimum stored trust score a player needs to claim (Restricted below).
pub const DEFAULT_MIN_CLAIM_TRUST: u8 = 40;

/// Maximum age of a location proof at claim time.
pub const DEFAULT_PROOF_MAX_AGE_SECS: u64 = 300;

/// Tolerated client clock skew for proofs stamped in the future.
pub const DEFAULT_PROOF_CLOCK_SKEW_SECS: u64 = 30;

/// Lifetime of an unanswered oracle request.
pub const DEFAULT_REQUEST_TTL_SECS: u64 = 3600;

/// Buffered events per subscriber before lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Ledger configuration.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Designated admin identity. Only this principal may initialize the
    /// registries, change the fee or overwrite trust scores.
    pub admin: AccountId,
    /// Claims from players whose stored trust is below this fail.
    pub min_claim_trust: u8,
    /// Proofs older than this (seconds) are rejected.
    pub proof_max_age_secs: u64,
    /// Proofs stamped further than this into the future are rejected.
    pub proof_clock_skew_secs: u64,
    /// Pending oracle requests expire after this many seconds.
    pub request_ttl_secs: u64,
    /// Broadcast channel capacity for the event feed.
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            admin: AccountId::derive("admin"),
            min_claim_trust: DEFAULT_MIN_CLAIM_TRUST,
            proof_max_age_secs: DEFAULT_PROOF_MAX_AGE_SECS,
            proof_clock_skew_secs: DEFAULT_PROOF_CLOCK_SKEW_SECS,
            request_ttl_secs: DEFAULT_REQUEST_TTL_SECS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl LedgerConfig {
    /// Default configuration with a specific admin.
    pub fn with_admin(admin: AccountId) -> Self {
        Self {
            admin,
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    ///
    /// `LEDGER_ADMIN` accepts a UUID; any other string is treated as a
    /// label and hashed into an id. Unparseable numbers fall back to
    /// the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            admin: std::env::var("LEDGER_ADMIN")
                .ok()
                .map(|v| AccountId::from_uuid_str(&v).unwrap_or_else(|| AccountId::derive(&v)))
                .unwrap_or(defaults.admin),
            min_claim_trust: env_parse("LEDGER_MIN_CLAIM_TRUST")
                .map(|v: u8| v.min(100))
                .unwrap_or(defaults.min_claim_trust),
            proof_max_age_secs: env_parse("LEDGER_PROOF_MAX_AGE_SECS")
                .unwrap_or(defaults.proof_max_age_secs),
            proof_clock_skew_secs: env_parse("LEDGER_PROOF_CLOCK_SKEW_SECS")
                .unwrap_or(defaults.proof_clock_skew_secs),
            request_ttl_secs: env_parse("LEDGER_REQUEST_TTL_SECS")
                .unwrap_or(defaults.request_ttl_secs),
            event_capacity: env_parse("LEDGER_EVENT_CAPACITY")
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.event_capacity),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.min_claim_trust, 40);
        assert_eq!(config.request_ttl_secs, 3600);
        assert_eq!(config.admin, AccountId::derive("admin"));
    }

    #[test]
    fn test_with_admin() {
        let admin = AccountId::new([5; 16]);
        let config = LedgerConfig::with_admin(admin);
        assert_eq!(config.admin, admin);
        assert_eq!(config.proof_max_age_secs, DEFAULT_PROOF_MAX_AGE_SECS);
    }

    // Single test touching the process environment, so parallel tests
    // cannot observe each other's variables.
    #[test]
    fn test_from_env() {
        std::env::set_var("LEDGER_ADMIN", "67e55044-10b1-426f-9247-bb680e5fe0c8");
        std::env::set_var("LEDGER_MIN_CLAIM_TRUST", "250");
        std::env::set_var("LEDGER_REQUEST_TTL_SECS", "not-a-number");
        std::env::set_var("LEDGER_EVENT_CAPACITY", "0");

        let config = LedgerConfig::from_env();
        assert_eq!(
            config.admin,
            AccountId::from_uuid_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap()
        );
        assert_eq!(config.min_claim_trust, 100);
        assert_eq!(config.request_ttl_secs, DEFAULT_REQUEST_TTL_SECS);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);

        std::env::set_var("LEDGER_ADMIN", "ops-multisig");
        assert_eq!(LedgerConfig::from_env().admin, AccountId::derive("ops-multisig"));

        for key in [
            "LEDGER_ADMIN",
            "LEDGER_MIN_CLAIM_TRUST",
            "LEDGER_REQUEST_TTL_SECS",
            "LEDGER_EVENT_CAPACITY",
        ] {
            std::env::remove_var(key);
        }
    }
}
