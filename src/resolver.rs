//! Place-name resolution
//!
//! Turns user-typed place names into IATA codes. Trivial cases (curated
//! overrides and codes the user already typed) are answered locally; the rest
//! go through the two-phase provider search and the ranking heuristic.
//! Resolution never fails outright: every path ends in a [`ResolutionOutcome`].

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{ErrorType, worst_of};
use crate::normalize::{is_location_code, normalize_key};
use crate::overrides::lookup_override;
use crate::provider::{LocationProvider, search_two_phase};
use crate::ranking::rank;

/// Where a resolved code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationSource {
    Override,
    UserCode,
    Provider,
}

/// A successful resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    /// Query as typed, trimmed
    pub raw: String,
    pub iata_code: String,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub source: LocationSource,
}

/// Result of resolving one place name.
///
/// `error_type == NONE` exactly when `result` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOutcome {
    pub result: Option<ResolvedLocation>,
    pub error_type: ErrorType,
}

impl ResolutionOutcome {
    pub fn resolved(location: ResolvedLocation) -> Self {
        Self {
            result: Some(location),
            error_type: ErrorType::None,
        }
    }

    pub fn failed(error_type: ErrorType) -> Self {
        debug_assert!(error_type.is_error());
        Self {
            result: None,
            error_type,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }
}

/// The place names of one trip search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripQuery {
    pub origin: String,
    pub destination: String,
    /// Optional second destination to compare against
    pub compare: Option<String>,
}

impl TripQuery {
    pub fn new<O: Into<String>, D: Into<String>>(origin: O, destination: D) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            compare: None,
        }
    }

    #[must_use]
    pub fn with_compare<C: Into<String>>(mut self, compare: C) -> Self {
        self.compare = Some(compare.into());
        self
    }
}

/// Outcomes for every place name of a trip plus the worst of them
#[derive(Debug, Clone, PartialEq)]
pub struct TripResolution {
    pub origin: ResolutionOutcome,
    pub destination: ResolutionOutcome,
    pub compare: Option<ResolutionOutcome>,
    pub error_type: ErrorType,
}

impl TripResolution {
    fn from_outcomes(
        origin: ResolutionOutcome,
        destination: ResolutionOutcome,
        compare: Option<ResolutionOutcome>,
    ) -> Self {
        let error_type = worst_of(
            [Some(&origin), Some(&destination), compare.as_ref()]
                .into_iter()
                .flatten()
                .map(|outcome| outcome.error_type),
        );
        Self {
            origin,
            destination,
            compare,
            error_type,
        }
    }

    /// Names of the inputs that did not resolve
    pub fn failed_inputs(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.origin.is_resolved() {
            failed.push("origin");
        }
        if !self.destination.is_resolved() {
            failed.push("destination");
        }
        if self.compare.as_ref().is_some_and(|c| !c.is_resolved()) {
            failed.push("compare");
        }
        failed
    }
}

/// Resolve a name without touching the network: overrides first, then typed codes
pub fn resolve_locally(query: &str) -> Option<ResolvedLocation> {
    let key = normalize_key(query);

    if let Some(record) = lookup_override(&key) {
        debug!("Override hit for '{}': {}", query, record.code);
        return Some(ResolvedLocation {
            raw: query.to_string(),
            iata_code: record.code.to_string(),
            name: record.name.to_string(),
            city: Some(record.city.to_string()),
            country: Some(record.country.to_string()),
            source: LocationSource::Override,
        });
    }

    if is_location_code(query) {
        let code = query.to_ascii_uppercase();
        debug!("Accepting '{}' as a location code", query);
        return Some(ResolvedLocation {
            raw: query.to_string(),
            iata_code: code.clone(),
            name: code,
            city: None,
            country: None,
            source: LocationSource::UserCode,
        });
    }

    None
}

/// Service for resolving place names into IATA codes
#[derive(Clone)]
pub struct AirportResolver {
    provider: Arc<dyn LocationProvider>,
}

impl AirportResolver {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self { provider }
    }

    /// Resolve one place name. Never panics and never returns an error.
    pub async fn resolve(&self, raw: &str) -> ResolutionOutcome {
        match AssertUnwindSafe(self.resolve_inner(raw)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Resolution of '{}' panicked", raw);
                ResolutionOutcome::failed(ErrorType::InternalError)
            }
        }
    }

    async fn resolve_inner(&self, raw: &str) -> ResolutionOutcome {
        let query = raw.trim();
        if query.is_empty() {
            debug!("Empty location query");
            return ResolutionOutcome::failed(ErrorType::NotFound);
        }

        if let Some(location) = resolve_locally(query) {
            return ResolutionOutcome::resolved(location);
        }

        let key = normalize_key(query);
        let candidates = match search_two_phase(self.provider.as_ref(), query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Location search for '{}' failed: {}", query, e);
                return ResolutionOutcome::failed(e.error_type());
            }
        };

        let Some(best) = rank(candidates, &key) else {
            warn!("No locations found for query: {}", query);
            return ResolutionOutcome::failed(ErrorType::NotFound);
        };

        info!(
            "Resolved '{}' to {} ({})",
            query,
            best.iata_code,
            best.country_code().unwrap_or("??")
        );

        ResolutionOutcome::resolved(ResolvedLocation {
            raw: query.to_string(),
            name: best.name.clone().unwrap_or_else(|| best.iata_code.clone()),
            city: best.city_name().map(str::to_string),
            country: best.country_code().map(str::to_string),
            iata_code: best.iata_code,
            source: LocationSource::Provider,
        })
    }

    /// Resolve several names concurrently, waiting for all of them
    pub async fn resolve_many<S: AsRef<str>>(
        &self,
        raws: &[S],
    ) -> (Vec<ResolutionOutcome>, ErrorType) {
        let outcomes =
            futures::future::join_all(raws.iter().map(|raw| self.resolve(raw.as_ref()))).await;
        let worst = worst_of(outcomes.iter().map(|outcome| outcome.error_type));
        (outcomes, worst)
    }

    /// Resolve the names of a trip concurrently and aggregate the worst outcome
    pub async fn resolve_trip(&self, query: &TripQuery) -> TripResolution {
        let compare = async {
            match &query.compare {
                Some(compare) => Some(self.resolve(compare).await),
                None => None,
            }
        };

        let (origin, destination, compare) = futures::join!(
            self.resolve(&query.origin),
            self.resolve(&query.destination),
            compare
        );

        let resolution = TripResolution::from_outcomes(origin, destination, compare);
        if resolution.error_type.is_error() {
            warn!(
                "Trip resolution failed with {} (inputs: {:?})",
                resolution.error_type,
                resolution.failed_inputs()
            );
        }
        resolution
    }
}
