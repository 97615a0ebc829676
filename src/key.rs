//! Client identity: key derivation and rate-limit exemptions.

use std::fmt;
use std::net::SocketAddr;

/// Identity placeholder when neither a forwarded header nor a peer address
/// is available. Keeps key derivation total: unidentifiable callers share
/// one bucket instead of raising an error.
const UNKNOWN_ADDR: &str = "unknown";

/// Authentication outcome supplied by the surrounding pipeline.
///
/// The limiter never authenticates anyone itself. Upstream auth middleware
/// inserts this into request extensions once credentials have been checked;
/// its absence means the same thing as [`AuthContext::Anonymous`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// Caller presented valid credentials for `principal`.
    Authenticated {
        /// Principal name as reported by the authenticator.
        principal: String,
    },
    /// No credentials, or credentials that identify nobody.
    Anonymous,
}

/// Stable per-caller identity used for quota accounting.
///
/// Rendered form is `user:<principal>` for authenticated callers and
/// `ip:<address>` for everyone else; equality is exact match on that form.
/// Produced fresh per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    /// Authenticated principal, keyed by name.
    User(String),
    /// Anonymous caller, keyed by best-effort source address.
    Ip(String),
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKey::User(name) => write!(f, "user:{name}"),
            ClientKey::Ip(addr) => write!(f, "ip:{addr}"),
        }
    }
}

/// Maps an inbound request to a [`ClientKey`] and decides exemption.
///
/// Pure functions of the request and auth context; no side effects.
#[derive(Debug, Clone)]
pub struct KeyClassifier {
    exempt_prefixes: Vec<String>,
}

impl KeyClassifier {
    pub fn new(exempt_prefixes: Vec<String>) -> Self {
        Self { exempt_prefixes }
    }

    /// True if `path` is excluded from rate limiting.
    ///
    /// Prefix match on the normalized request path; membership comes from
    /// configuration, not from anything derived at runtime.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Derive the accounting key for a request.
    ///
    /// Authenticated principals are keyed by name, so one user roaming
    /// across addresses still shares a single quota. Anonymous callers are
    /// keyed by the first hop of the forwarded-for chain when present and
    /// non-empty, falling back to the transport peer address.
    pub fn classify(
        &self,
        auth: Option<&AuthContext>,
        forwarded_for: Option<&str>,
        peer: Option<SocketAddr>,
    ) -> ClientKey {
        if let Some(AuthContext::Authenticated { principal }) = auth {
            return ClientKey::User(principal.clone());
        }

        // An empty or whitespace-only forwarded header must not become an
        // empty key; fall through to the peer address instead.
        let forwarded = forwarded_for
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());

        let addr = match forwarded {
            Some(hop) => hop.to_string(),
            None => match peer {
                Some(peer) => peer.ip().to_string(),
                None => UNKNOWN_ADDR.to_string(),
            },
        };

        ClientKey::Ip(addr)
    }
}
