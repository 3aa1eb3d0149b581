use std::sync::Arc;
use std::time::Duration;

use airport_resolver::api::{self, AppState};
use airport_resolver::messages::UNAVAILABLE_MESSAGE;
use airport_resolver::provider::CandidateAddress;
use airport_resolver::web;
use airport_resolver::{
    AirportResolver, ApiError, Candidate, LocationProvider, RequestError, ResolveClient,
    ResolverError, RetryPolicy, SubType, TripQuery, VERSION, user_message,
};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Answers a handful of fixed queries; everything else finds nothing
struct StubProvider;

#[async_trait]
impl LocationProvider for StubProvider {
    async fn search(
        &self,
        query: &str,
        sub_type: SubType,
    ) -> Result<Vec<Candidate>, ResolverError> {
        match (query, sub_type) {
            ("Down", _) => Err(ResolverError::from_status(503, "Service Unavailable")),
            ("Broken", _) => Err(ResolverError::malformed("unexpected payload")),
            ("Dublin City", SubType::City) => Ok(vec![
                candidate("DBN", "DUBLIN", "US", "CITY"),
                candidate("DUB", "DUBLIN", "IE", "CITY"),
            ]),
            _ => Ok(Vec::new()),
        }
    }
}

/// Takes far longer than any request timeout used below
struct SlowProvider;

#[async_trait]
impl LocationProvider for SlowProvider {
    async fn search(
        &self,
        _query: &str,
        _sub_type: SubType,
    ) -> Result<Vec<Candidate>, ResolverError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    }
}

fn candidate(code: &str, city: &str, country: &str, sub_type: &str) -> Candidate {
    Candidate {
        iata_code: code.to_string(),
        name: Some(city.to_string()),
        sub_type: Some(sub_type.to_string()),
        address: Some(CandidateAddress {
            city_name: Some(city.to_string()),
            country_code: Some(country.to_string()),
        }),
    }
}

fn app() -> axum::Router {
    api::router(AppState::new(AirportResolver::new(Arc::new(StubProvider))))
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_missing_destination_is_validation_error() {
    let (status, body) = get("/resolve-airports?origin=Dublin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(!body["error"]["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_origin_is_validation_error() {
    let (status, body) = get("/resolve-airports?origin=%20%20&destination=LIS").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_overrides_resolve_without_provider() {
    let (status, body) = get("/resolve-airports?origin=Dublin&destination=lisboa").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["origin"]["iataCode"], "DUB");
    assert_eq!(body["origin"]["source"], "override");
    assert_eq!(body["destination"]["iataCode"], "LIS");
    assert_eq!(body["destination"]["country"], "PT");
    assert!(body["compare"].is_null());
}

#[tokio::test]
async fn test_provider_ranking_prefers_ireland() {
    let (status, body) =
        get("/resolve-airports?origin=Dublin%20City&destination=jfk&compare=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["origin"]["iataCode"], "DUB");
    assert_eq!(body["origin"]["country"], "IE");
    assert_eq!(body["origin"]["source"], "provider");
    assert_eq!(body["destination"]["iataCode"], "JFK");
    assert_eq!(body["destination"]["source"], "user-code");
    assert!(body["compare"].is_null());
}

#[tokio::test]
async fn test_unavailable_provider_returns_503_envelope() {
    let (status, body) = get("/resolve-airports?origin=DUB&destination=Down").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    assert_eq!(body["error"]["details"], json!({ "failed": ["destination"] }));

    // What a consuming client makes of it
    let bytes = serde_json::to_vec(&body).unwrap();
    let error = RequestError::Api(ApiError::from_body(503, &bytes));
    assert_eq!(error.code(), Some("UPSTREAM_UNAVAILABLE"));
    assert_eq!(user_message(&error), UNAVAILABLE_MESSAGE);
    assert!(user_message(&error).contains("try again shortly"));
}

#[tokio::test]
async fn test_unknown_place_is_404() {
    let (status, body) = get("/resolve-airports?origin=DUB&destination=Atlantis").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bad_provider_response_is_502() {
    let (status, body) = get("/resolve-airports?origin=Broken&destination=LIS").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_BAD_RESPONSE");
    assert_eq!(body["error"]["details"], json!({ "failed": ["origin"] }));
}

#[tokio::test]
async fn test_failed_compare_degrades_the_aggregate() {
    let (status, body) = get("/resolve-airports?origin=DUB&destination=LIS&compare=Atlantis").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["details"], json!({ "failed": ["compare"] }));
}

#[tokio::test]
async fn test_worst_error_wins() {
    let (status, body) =
        get("/resolve-airports?origin=Atlantis&destination=Broken&compare=Down").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["error"]["details"],
        json!({ "failed": ["origin", "destination", "compare"] })
    );
}

#[tokio::test]
async fn test_slow_provider_times_out_with_envelope() {
    let state = AppState::new(AirportResolver::new(Arc::new(SlowProvider)))
        .with_request_timeout(Duration::from_millis(100));
    let response = web::app(state)
        .oneshot(
            Request::builder()
                .uri("/resolve-airports?origin=Slow%20Town&destination=LIS")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    assert_eq!(body["error"]["details"]["failed"], json!(["origin", "destination"]));

    let error = RequestError::Api(ApiError::from_body(503, &bytes));
    assert!(error.is_retryable());
    assert_eq!(user_message(&error), UNAVAILABLE_MESSAGE);
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], VERSION);
}

#[tokio::test]
async fn test_client_against_running_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app()).await.unwrap();
    });

    let client = ResolveClient::with_policy(
        &format!("http://{addr}"),
        RetryPolicy::new(0, Duration::from_millis(1)),
    );

    let response = client
        .resolve_trip(&TripQuery::new("Tenerife", "nyc").with_compare("São Paulo"))
        .await
        .unwrap();
    assert_eq!(response.origin.unwrap().iata_code, "TCI");
    assert_eq!(response.destination.unwrap().iata_code, "NYC");
    assert_eq!(response.compare.unwrap().iata_code, "SAO");

    let error = client
        .resolve_trip(&TripQuery::new("DUB", "Atlantis"))
        .await
        .unwrap_err();
    assert_eq!(error.status(), Some(404));
    assert_eq!(error.code(), Some("NOT_FOUND"));
}
