//! Client for a running resolver server
//!
//! Calls `/resolve-airports` through the [`RetryingClient`], so a server that
//! is briefly unavailable (502/503/504 or no connection) is retried before the
//! failure is reported.

use reqwest::Client;
use tracing::{debug, instrument};

use crate::api::ResolveResponse;
use crate::resolver::TripQuery;
use crate::retry::{RequestError, RetryPolicy, RetryingClient};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

#[derive(Clone)]
pub struct ResolveClient {
    http: RetryingClient,
    resolve_url: String,
}

impl ResolveClient {
    pub fn new(http: RetryingClient, server_url: &str) -> Self {
        Self {
            http,
            resolve_url: format!("{}/resolve-airports", server_url.trim_end_matches('/')),
        }
    }

    pub fn with_policy(server_url: &str, policy: RetryPolicy) -> Self {
        Self::new(RetryingClient::new(Client::new(), policy), server_url)
    }

    /// Resolve a trip's place names on the server
    #[instrument(skip(self), fields(origin = %query.origin, destination = %query.destination))]
    pub async fn resolve_trip(&self, query: &TripQuery) -> Result<ResolveResponse, RequestError> {
        let mut params = vec![
            ("origin", query.origin.as_str()),
            ("destination", query.destination.as_str()),
        ];
        if let Some(compare) = &query.compare {
            params.push(("compare", compare.as_str()));
        }

        let request = self.http.http().get(&self.resolve_url).query(&params);
        let response = self.http.send(request).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::network(format!("Failed to read response: {e}")))?;
        debug!("Received {} bytes from resolver", body.len());

        serde_json::from_slice(&body)
            .map_err(|e| RequestError::invalid(format!("Unexpected response body: {e}")))
    }
}
