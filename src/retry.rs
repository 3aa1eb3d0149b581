//! Retrying HTTP client
//!
//! Wraps a [`reqwest::Client`] with a fixed-delay retry loop. Transient
//! statuses (502, 503, 504) and connection-level failures are retried up to
//! the configured budget; anything else fails straight away. Failures come back
//! as a [`RequestError`] rebuilt from the standard error envelope
//! `{ "error": { "code", "message", "details"? } }` when the body carries one.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::RetryConfig;

/// Statuses worth another attempt
pub const TRANSIENT_STATUSES: [u16; 3] = [502, 503, 504];

/// Code used when a failed response carries no envelope
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";

/// How many times to retry and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_millis(4000),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.retries, Duration::from_millis(config.delay_ms))
    }
}

/// Suspension point between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Body of the standard error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Standard error envelope shared by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    pub fn new<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

// Lenient view used when reading somebody else's error body
#[derive(Debug, Deserialize)]
struct PartialEnvelope {
    error: Option<PartialErrorBody>,
}

#[derive(Debug, Deserialize)]
struct PartialErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<Value>,
}

/// A non-2xx response, decoded
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (status {status}, code {code})")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub code: String,
    pub details: Option<Value>,
}

impl ApiError {
    /// Build from a status and raw body, using the envelope when present
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let error = serde_json::from_slice::<PartialEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error);

        let (code, message, details) = match error {
            Some(body) => (body.code, body.message, body.details),
            None => (None, None, None),
        };

        Self {
            message: message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Request failed with status {status}")),
            status,
            code: code
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_string()),
            details,
        }
    }

    async fn from_response(response: Response) -> Self {
        let status = response.status().as_u16();
        let body = response.bytes().await.unwrap_or_default();
        Self::from_body(status, &body)
    }

    pub fn is_transient(&self) -> bool {
        TRANSIENT_STATUSES.contains(&self.status)
    }
}

/// Failure of a [`RetryingClient`] call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The server answered with a non-2xx status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No response was received
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request could not be built or replayed, or the reply not decoded
    #[error("Invalid request: {message}")]
    Invalid { message: String },
}

impl RequestError {
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Api(api) => Some(api.status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            RequestError::Api(api) => Some(api.code.as_str()),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Api(api) => api.is_transient(),
            RequestError::Network { .. } => true,
            RequestError::Invalid { .. } => false,
        }
    }
}

/// HTTP client with a fixed-delay retry budget
#[derive(Clone)]
pub struct RetryingClient {
    http: Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingClient {
    pub fn new(http: Client, policy: RetryPolicy) -> Self {
        Self {
            http,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper, mostly useful in tests
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send a request, retrying transient failures.
    ///
    /// The builder is cloned for every attempt, so it must not carry a
    /// streaming body. The same request is replayed verbatim; callers only
    /// pass idempotent requests here.
    #[instrument(skip_all, fields(request = %describe(&request)))]
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, RequestError> {
        let max_attempts = self.policy.max_attempts();
        let request_start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let builder = request
                .try_clone()
                .ok_or_else(|| RequestError::invalid("request body cannot be replayed"))?;

            debug!("Making HTTP request (attempt {}/{})", attempt + 1, max_attempts);

            let error = match builder.send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        "Successful request in {:.3}s (attempt {})",
                        request_start.elapsed().as_secs_f64(),
                        attempt + 1
                    );
                    return Ok(response);
                }
                Ok(response) => RequestError::Api(ApiError::from_response(response).await),
                Err(e) if e.is_builder() => return Err(RequestError::invalid(e.to_string())),
                Err(e) => RequestError::network(e.to_string()),
            };

            if !error.is_retryable() || attempt >= self.policy.retries {
                if error.is_retryable() {
                    warn!("Request failed after {} attempts: {}", max_attempts, error);
                } else {
                    debug!("Request failed with non-retryable error: {}", error);
                }
                return Err(error);
            }

            warn!(
                "Attempt {} of {} failed: {}. Retrying in {}ms",
                attempt + 1,
                max_attempts,
                error,
                self.policy.delay.as_millis()
            );
            self.sleeper.sleep(self.policy.delay).await;
            attempt += 1;
        }
    }

    /// Convenience wrapper for a plain GET
    pub async fn get(&self, url: &str) -> Result<Response, RequestError> {
        self.send(self.http.get(url)).await
    }
}

fn describe(request: &RequestBuilder) -> String {
    request
        .try_clone()
        .and_then(|builder| builder.build().ok())
        .map(|req| format!("{} {}", req.method(), req.url().path()))
        .unwrap_or_else(|| "<unbuildable request>".to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records requested delays without waiting
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub(crate) slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub(crate) fn total(&self) -> Duration {
            self.slept.lock().unwrap().iter().sum()
        }

        pub(crate) fn count(&self) -> usize {
            self.slept.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn client(sleeper: Arc<RecordingSleeper>) -> RetryingClient {
        RetryingClient::new(Client::new(), RetryPolicy::default()).with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_retries_transient_status_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let response = client(sleeper.clone())
            .get(&format!("{}/flaky", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(sleeper.count(), 2);
        assert_eq!(sleeper.total(), 2 * RetryPolicy::default().delay);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": "VALIDATION_ERROR", "message": "origin is required" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let error = client(sleeper.clone())
            .get(&format!("{}/bad", server.uri()))
            .await
            .unwrap_err();

        assert_eq!(sleeper.count(), 0);
        assert_eq!(
            error,
            RequestError::Api(ApiError {
                message: "origin is required".to_string(),
                status: 400,
                code: "VALIDATION_ERROR".to_string(),
                details: None,
            })
        );
    }

    #[tokio::test]
    async fn test_exhausted_budget_surfaces_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {
                    "code": "UPSTREAM_UNAVAILABLE",
                    "message": "Location provider unavailable",
                    "details": { "failed": ["destination"] }
                }
            })))
            .expect(3)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let error = client(sleeper.clone())
            .get(&format!("{}/down", server.uri()))
            .await
            .unwrap_err();

        assert_eq!(sleeper.count(), 2);
        assert_eq!(error.status(), Some(503));
        assert_eq!(error.code(), Some("UPSTREAM_UNAVAILABLE"));
        match error {
            RequestError::Api(api) => {
                assert_eq!(api.details, Some(serde_json::json!({ "failed": ["destination"] })));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_internal_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let error = client(sleeper.clone()).get(&server.uri()).await.unwrap_err();

        assert_eq!(sleeper.count(), 0);
        assert_eq!(error.code(), Some(UNKNOWN_ERROR_CODE));
        assert_eq!(
            error.to_string(),
            "Request failed with status 500 (status 500, code UNKNOWN_ERROR)"
        );
    }

    #[tokio::test]
    async fn test_connection_failure_is_retried_then_reported() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = RetryPolicy::new(1, Duration::from_millis(10));
        let retrying = RetryingClient::new(Client::new(), policy).with_sleeper(sleeper.clone());

        let error = retrying.get("http://127.0.0.1:1/unreachable").await.unwrap_err();

        assert!(matches!(error, RequestError::Network { .. }));
        assert_eq!(sleeper.count(), 1);
        assert_eq!(sleeper.total(), Duration::from_millis(10));
    }

    #[test]
    fn test_api_error_from_partial_envelope() {
        let error = ApiError::from_body(404, br#"{"error":{"message":"No such place"}}"#);
        assert_eq!(error.message, "No such place");
        assert_eq!(error.code, UNKNOWN_ERROR_CODE);

        let error = ApiError::from_body(502, b"not json");
        assert_eq!(error.message, "Request failed with status 502");
        assert!(error.is_transient());
    }
}
