use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{
    ErrorType, VERSION,
    resolver::{AirportResolver, ResolvedLocation, TripQuery, TripResolution},
    retry::ErrorEnvelope,
};

pub const VALIDATION_ERROR_CODE: &str = "VALIDATION_ERROR";

/// Token request plus two search phases with the default retry budget
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(226);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub resolver: AirportResolver,
    /// Longest a single `/resolve-airports` call may take
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(resolver: AirportResolver) -> Self {
        Self {
            resolver,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveParams {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub compare: Option<String>,
}

/// Body of a successful `/resolve-airports` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub origin: Option<ResolvedLocation>,
    pub destination: Option<ResolvedLocation>,
    pub compare: Option<ResolvedLocation>,
}

impl From<TripResolution> for ResolveResponse {
    fn from(resolution: TripResolution) -> Self {
        Self {
            origin: resolution.origin.result,
            destination: resolution.destination.result,
            compare: resolution.compare.and_then(|c| c.result),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response carrying the standard envelope
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl ApiFailure {
    fn validation(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            envelope: ErrorEnvelope::new(VALIDATION_ERROR_CODE, message),
        }
    }

    fn from_resolution(resolution: &TripResolution) -> Self {
        let error_type = resolution.error_type;
        Self {
            status: status_for(error_type),
            envelope: ErrorEnvelope::new(error_type.code(), failure_message(error_type))
                .with_details(json!({ "failed": resolution.failed_inputs() })),
        }
    }

    fn timed_out(query: &TripQuery) -> Self {
        let mut inputs = vec!["origin", "destination"];
        if query.compare.is_some() {
            inputs.push("compare");
        }
        let error_type = ErrorType::UpstreamUnavailable;
        Self {
            status: status_for(error_type),
            envelope: ErrorEnvelope::new(error_type.code(), failure_message(error_type))
                .with_details(json!({ "failed": inputs, "timedOut": true })),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// HTTP status for a non-`NONE` aggregate
pub fn status_for(error_type: ErrorType) -> StatusCode {
    match error_type {
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorType::UpstreamBadResponse => StatusCode::BAD_GATEWAY,
        ErrorType::InternalError | ErrorType::None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure_message(error_type: ErrorType) -> &'static str {
    match error_type {
        ErrorType::NotFound => "No airport found for one or more locations",
        ErrorType::UpstreamUnavailable => "Location service is temporarily unavailable",
        ErrorType::UpstreamBadResponse => "Location service returned an unexpected response",
        ErrorType::InternalError | ErrorType::None => "Unexpected error while resolving locations",
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/resolve-airports", get(resolve_airports))
        .route("/health", get(health))
        .with_state(state)
}

async fn resolve_airports(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<ResolveResponse>, ApiFailure> {
    let (Some(origin), Some(destination)) =
        (non_blank(params.origin), non_blank(params.destination))
    else {
        return Err(ApiFailure::validation("Both origin and destination are required."));
    };

    let mut query = TripQuery::new(origin, destination);
    if let Some(compare) = non_blank(params.compare) {
        query = query.with_compare(compare);
    }

    let Ok(resolution) =
        tokio::time::timeout(state.request_timeout, state.resolver.resolve_trip(&query)).await
    else {
        error!(
            "Resolving '{}' -> '{}' exceeded {}ms",
            query.origin,
            query.destination,
            state.request_timeout.as_millis()
        );
        return Err(ApiFailure::timed_out(&query));
    };
    if resolution.error_type.is_error() {
        warn!(
            "Returning {} for '{}' -> '{}'",
            resolution.error_type, query.origin, query.destination
        );
        return Err(ApiFailure::from_resolution(&resolution));
    }

    info!("Resolved '{}' -> '{}'", query.origin, query.destination);
    Ok(Json(resolution.into()))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
    })
}
