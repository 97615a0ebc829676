//! Error types for admission configuration.
//!
//! The limiter itself has no fallible operations: `try_admit` returns a
//! boolean and a refused request is data ([`Decision::Reject`]), not an
//! error. The only thing that can go wrong is bad configuration.
//!
//! [`Decision::Reject`]: crate::gate::Decision::Reject

/// Errors produced when validating admission configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Quota must admit at least one request per minute.
    #[error("requests_per_minute must be > 0 (got {provided})")]
    InvalidRequestsPerMinute {
        /// Value provided by caller.
        provided: u32,
    },
    /// Sweep period must be non-zero or the timer would spin.
    #[error("sweep_interval_secs must be > 0 (got {provided})")]
    InvalidSweepInterval {
        /// Value provided by caller.
        provided: u64,
    },
    /// Idle cutoff must be non-zero or every sweep would evict everything.
    #[error("idle_cutoff_secs must be > 0 (got {provided})")]
    InvalidIdleCutoff {
        /// Value provided by caller.
        provided: u64,
    },
}
