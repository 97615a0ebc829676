//! Convenient re-exports for common Turnstile types.
pub use crate::{
    clock::{Clock, ManualClock, MonotonicClock},
    config::AdmissionConfig,
    error::ConfigError,
    gate::{AdmissionGate, Decision, Rejection, RejectionBody, RequestContext},
    key::{AuthContext, ClientKey, KeyClassifier},
    middleware::{AdmissionLayer, AdmissionService, PeerAddr},
    store::QuotaStore,
    sweep::spawn_sweeper,
};
