//! Airport resolver - turns free-form place names into IATA codes
//!
//! This library provides the name normalizer, curated overrides, the
//! credential-cached location-search client, candidate ranking, the
//! retrying HTTP client and the `/resolve-airports` endpoint built on them.

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod messages;
pub mod normalize;
pub mod overrides;
pub mod provider;
pub mod ranking;
pub mod resolver;
pub mod retry;
pub mod web;

// Re-export core types for public API
pub use api::{AppState, ResolveResponse};
pub use client::ResolveClient;
pub use config::ResolverConfig;
pub use credentials::{Clock, Credential, CredentialCache, SystemClock};
pub use error::{ErrorType, ResolverError, pick_worst_error, worst_of};
pub use messages::user_message;
pub use provider::{AmadeusClient, Candidate, LocationProvider, SubType};
pub use resolver::{
    AirportResolver, LocationSource, ResolutionOutcome, ResolvedLocation, TripQuery,
    TripResolution,
};
pub use retry::{ApiError, ErrorEnvelope, RequestError, RetryPolicy, RetryingClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
