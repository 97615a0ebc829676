//! Admission limiter configuration.

use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Path prefixes exempt from limiting by default: authentication, ops
/// endpoints, API docs, the realtime socket, and the public image proxy.
pub const DEFAULT_EXEMPT_PREFIXES: &[&str] = &[
    "/api/v1/auth",
    "/api/actuator",
    "/api/swagger-ui",
    "/api/v3/api-docs",
    "/api/ws",
    "/api/v1/images",
];

/// Configuration for the admission limiter.
///
/// Every field has a default, so a partial config file deserializes cleanly.
/// Values are validated by [`AdmissionGate::new`], which calls
/// [`AdmissionConfig::validate`].
///
/// [`AdmissionGate::new`]: crate::gate::AdmissionGate::new
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Requests each client key may spend per rolling minute. This is also
    /// the bucket capacity: a fully idle minute earns the whole quota back.
    pub requests_per_minute: u32,
    /// Seconds between eviction sweep runs.
    pub sweep_interval_secs: u64,
    /// Seconds a bucket may go untouched before the sweep drops it.
    pub idle_cutoff_secs: u64,
    /// Path prefixes that bypass limiting entirely.
    pub exempt_prefixes: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 100,
            sweep_interval_secs: 300,
            idle_cutoff_secs: 600,
            exempt_prefixes: DEFAULT_EXEMPT_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl AdmissionConfig {
    /// Default config with a different per-minute ceiling.
    pub fn with_requests_per_minute(requests_per_minute: u32) -> Self {
        Self { requests_per_minute, ..Self::default() }
    }

    /// Reject zero quotas and zero timer periods.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requests_per_minute == 0 {
            return Err(ConfigError::InvalidRequestsPerMinute {
                provided: self.requests_per_minute,
            });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidSweepInterval { provided: self.sweep_interval_secs });
        }
        if self.idle_cutoff_secs == 0 {
            return Err(ConfigError::InvalidIdleCutoff { provided: self.idle_cutoff_secs });
        }
        Ok(())
    }

    /// How often the eviction sweep runs.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// How long a bucket may sit untouched before eviction.
    pub fn idle_cutoff(&self) -> Duration {
        Duration::from_secs(self.idle_cutoff_secs)
    }
}
