#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Turnstile
//!
//! Per-client request admission limiting for async Rust services: token-bucket
//! quotas, key classification, and idle-bucket eviction.
//!
//! ## Features
//!
//! - **Token-bucket quotas** with greedy refill: idle time earns tokens back
//!   continuously, capped at capacity
//! - **Key classification**: authenticated principals share one quota across
//!   addresses; anonymous callers are keyed by best-effort source address
//! - **Exempt paths**: configured prefixes (auth, ops, docs) bypass limiting
//! - **Idle-bucket eviction** on a background timer, off the request path
//! - **Tower middleware** for dropping the gate in front of an HTTP service
//!
//! ## Quick Start
//!
//! ```rust
//! use turnstile::{AdmissionConfig, AdmissionGate, RequestContext};
//!
//! # fn main() -> Result<(), turnstile::ConfigError> {
//! let gate = AdmissionGate::new(AdmissionConfig::default())?;
//!
//! let decision = gate.admit(&RequestContext {
//!     path: "/api/v1/albums",
//!     auth: None,
//!     forwarded_for: None,
//!     peer: "203.0.113.9:443".parse().ok(),
//! });
//! assert!(decision.is_proceed());
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod key;
pub mod middleware;
pub mod prelude;
pub mod store;
pub mod sweep;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::AdmissionConfig;
pub use error::ConfigError;
pub use gate::{AdmissionGate, Decision, Rejection, RejectionBody, RequestContext};
pub use key::{AuthContext, ClientKey, KeyClassifier};
pub use middleware::{AdmissionLayer, AdmissionService, PeerAddr};
pub use store::QuotaStore;
pub use sweep::spawn_sweeper;
