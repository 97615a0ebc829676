//! Per-request admission decisions.

use crate::clock::{Clock, MonotonicClock};
use crate::config::AdmissionConfig;
use crate::error::ConfigError;
use crate::key::{AuthContext, KeyClassifier};
use crate::store::QuotaStore;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Machine-readable kind for quota refusals.
pub const RATE_LIMITED: &str = "RATE_LIMITED";

/// Everything the gate needs to know about an inbound request. Supplied by
/// the surrounding pipeline; see [`crate::middleware`] for the HTTP wiring.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Normalized request path.
    pub path: &'a str,
    /// Authentication outcome from upstream middleware, if any ran.
    pub auth: Option<&'a AuthContext>,
    /// Raw forwarded-for header value, if present.
    pub forwarded_for: Option<&'a str>,
    /// Transport-level peer address, if known.
    pub peer: Option<SocketAddr>,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Request may continue down the pipeline unmodified.
    Proceed,
    /// Request is over quota; the pipeline must stop it and answer with
    /// the contained rejection.
    Reject(Rejection),
}

impl Decision {
    /// Helper to check if the request was admitted.
    pub fn is_proceed(&self) -> bool {
        matches!(self, Decision::Proceed)
    }
}

/// Structured refusal for an over-quota request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    limit: u32,
    retry_after: Duration,
}

impl Rejection {
    fn new(limit: u32) -> Self {
        // Time for one token to refill; the soonest a retry could succeed.
        let retry_after = Duration::from_secs_f64(60.0 / f64::from(limit.max(1)));
        Self { limit, retry_after }
    }

    /// HTTP status the pipeline should answer with.
    pub fn status(&self) -> u16 {
        429
    }

    /// Machine-readable error kind ([`RATE_LIMITED`]).
    pub fn kind(&self) -> &'static str {
        RATE_LIMITED
    }

    /// Configured per-minute ceiling that was exceeded.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Hint for a `Retry-After` header.
    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    /// Serializable response body.
    pub fn body(&self) -> RejectionBody {
        RejectionBody {
            error: "Too Many Requests",
            message: format!(
                "Rate limit exceeded. Maximum {} requests per minute allowed.",
                self.limit
            ),
        }
    }
}

/// Wire shape of the refusal body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionBody {
    pub error: &'static str,
    pub message: String,
}

/// Composes the key classifier and quota store into the per-request
/// decision.
///
/// The gate itself is stateless and idempotent; all mutable state lives in
/// the shared [`QuotaStore`]. Clones share that store, so one gate can sit
/// in front of several server tasks while every caller is accounted against
/// the same quota.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    classifier: KeyClassifier,
    store: Arc<QuotaStore>,
    limit: u32,
}

impl AdmissionGate {
    /// Build a gate from configuration, using the monotonic clock.
    pub fn new(config: AdmissionConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(MonotonicClock::default()))
    }

    /// Build a gate with an injected clock. Tests use this with
    /// [`crate::clock::ManualClock`] to simulate refill windows.
    pub fn with_clock(config: AdmissionConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let limit = config.requests_per_minute;
        Ok(Self {
            classifier: KeyClassifier::new(config.exempt_prefixes),
            store: Arc::new(QuotaStore::new(limit, clock)),
            limit,
        })
    }

    /// Shared handle to the underlying store, e.g. for
    /// [`crate::sweep::spawn_sweeper`].
    pub fn store(&self) -> Arc<QuotaStore> {
        Arc::clone(&self.store)
    }

    /// Configured requests-per-minute ceiling.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Decide whether `request` may proceed.
    ///
    /// Exempt paths always proceed, even for a caller whose bucket is
    /// exhausted. Everything else costs one token from the caller's quota.
    pub fn admit(&self, request: &RequestContext<'_>) -> Decision {
        if self.classifier.is_exempt(request.path) {
            return Decision::Proceed;
        }

        let key = self.classifier.classify(request.auth, request.forwarded_for, request.peer);
        if self.store.try_admit(&key) {
            Decision::Proceed
        } else {
            warn!(target: "turnstile::gate", key = %key, limit = self.limit, "rate limit exceeded");
            Decision::Reject(Rejection::new(self.limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn gate(requests_per_minute: u32) -> AdmissionGate {
        AdmissionGate::with_clock(
            AdmissionConfig::with_requests_per_minute(requests_per_minute),
            Arc::new(ManualClock::new()),
        )
        .expect("valid config")
    }

    fn anonymous(path: &str) -> RequestContext<'_> {
        RequestContext {
            path,
            auth: None,
            forwarded_for: None,
            peer: "198.51.100.7:443".parse().ok(),
        }
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let result = AdmissionGate::new(AdmissionConfig::with_requests_per_minute(0));
        assert_eq!(result.err(), Some(ConfigError::InvalidRequestsPerMinute { provided: 0 }));
    }

    #[test]
    fn rejection_carries_status_kind_and_ceiling() {
        let gate = gate(1);
        assert!(gate.admit(&anonymous("/api/v1/albums")).is_proceed());

        match gate.admit(&anonymous("/api/v1/albums")) {
            Decision::Reject(rejection) => {
                assert_eq!(rejection.status(), 429);
                assert_eq!(rejection.kind(), RATE_LIMITED);
                assert_eq!(rejection.limit(), 1);
                assert_eq!(rejection.retry_after(), Duration::from_secs(60));
            }
            Decision::Proceed => panic!("second request should be rejected"),
        }
    }

    #[test]
    fn rejection_body_matches_the_wire_contract() {
        let gate = gate(7);
        for _ in 0..7 {
            assert!(gate.admit(&anonymous("/api/v1/albums")).is_proceed());
        }
        let Decision::Reject(rejection) = gate.admit(&anonymous("/api/v1/albums")) else {
            panic!("eighth request should be rejected");
        };
        let json = serde_json::to_string(&rejection.body()).expect("serializable body");
        assert_eq!(
            json,
            r#"{"error":"Too Many Requests","message":"Rate limit exceeded. Maximum 7 requests per minute allowed."}"#
        );
    }

    #[test]
    fn exempt_paths_proceed_with_exhausted_bucket() {
        let gate = gate(1);
        assert!(gate.admit(&anonymous("/api/v1/albums")).is_proceed());
        assert!(!gate.admit(&anonymous("/api/v1/albums")).is_proceed());

        // Same caller, exempt prefix: no token needed.
        assert!(gate.admit(&anonymous("/api/v1/auth/refresh")).is_proceed());
        assert!(gate.admit(&anonymous("/api/actuator/health")).is_proceed());
    }

    #[test]
    fn gate_clones_share_the_store() {
        let gate = gate(1);
        let clone = gate.clone();
        assert!(gate.admit(&anonymous("/api/v1/albums")).is_proceed());
        assert!(!clone.admit(&anonymous("/api/v1/albums")).is_proceed());
    }
}
