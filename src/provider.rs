//! Location-search provider client
//!
//! Queries the provider's reference-data locations endpoint for airport and
//! city candidates. A lookup runs in two phases: city-level first, because a
//! city code covers every airport serving the metro area, then airports and
//! cities together when the first phase comes back empty.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::ResolverError;
use crate::config::ResolverConfig;
use crate::credentials::CredentialCache;
use crate::retry::{RequestError, RetryPolicy, RetryingClient};

/// Location kind filter understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubType {
    City,
    AirportOrCity,
}

impl SubType {
    pub fn as_query(self) -> &'static str {
        match self {
            SubType::City => "CITY",
            SubType::AirportOrCity => "AIRPORT,CITY",
        }
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Address part of a provider candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateAddress {
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// One location returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub iata_code: String,
    #[serde(default)]
    pub name: Option<String>,
    /// `CITY`, `AIRPORT` or something else entirely
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub address: Option<CandidateAddress>,
}

impl Candidate {
    pub fn city_name(&self) -> Option<&str> {
        self.address.as_ref().and_then(|a| a.city_name.as_deref())
    }

    pub fn country_code(&self) -> Option<&str> {
        self.address.as_ref().and_then(|a| a.country_code.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    data: Vec<Candidate>,
}

/// Anything that can search for location candidates
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// One search call for a single sub-type filter
    async fn search(&self, query: &str, sub_type: SubType) -> Result<Vec<Candidate>, ResolverError>;
}

/// City first, then airport-or-city when the city search found nothing.
///
/// An empty result after both phases is not an error here; the caller turns
/// it into `NOT_FOUND`.
pub async fn search_two_phase(
    provider: &dyn LocationProvider,
    query: &str,
) -> Result<Vec<Candidate>, ResolverError> {
    let cities = provider.search(query, SubType::City).await?;
    if !cities.is_empty() {
        return Ok(cities);
    }

    debug!("No city match for '{}', retrying with airports", query);
    provider.search(query, SubType::AirportOrCity).await
}

/// Client for the Amadeus reference-data locations API
pub struct AmadeusClient {
    http: RetryingClient,
    credentials: Arc<CredentialCache>,
    locations_url: String,
    page_limit: u32,
}

impl AmadeusClient {
    pub fn new(
        http: RetryingClient,
        credentials: Arc<CredentialCache>,
        base_url: &str,
        page_limit: u32,
    ) -> Self {
        Self {
            http,
            credentials,
            locations_url: format!(
                "{}/v1/reference-data/locations",
                base_url.trim_end_matches('/')
            ),
            page_limit,
        }
    }

    /// True when the credential cache holds client credentials
    pub fn is_configured(&self) -> bool {
        self.credentials.is_configured()
    }

    /// Build the client, its credential cache and HTTP stack from configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolverError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.provider.timeout_seconds.into()))
            .user_agent(concat!("airport-resolver/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResolverError::internal(format!("Failed to create HTTP client: {e}")))?;

        let credentials = Arc::new(CredentialCache::new(http.clone(), &config.provider));
        let retrying = RetryingClient::new(http, RetryPolicy::from(&config.retry));

        Ok(Self::new(
            retrying,
            credentials,
            &config.provider.base_url,
            config.provider.page_limit,
        ))
    }
}

#[async_trait]
impl LocationProvider for AmadeusClient {
    #[instrument(skip(self), fields(sub_type = %sub_type))]
    async fn search(
        &self,
        query: &str,
        sub_type: SubType,
    ) -> Result<Vec<Candidate>, ResolverError> {
        let token = self.credentials.get_token().await?;
        let page_limit = self.page_limit.to_string();

        let request = self
            .http
            .http()
            .get(&self.locations_url)
            .bearer_auth(token)
            .query(&[
                ("keyword", query),
                ("subType", sub_type.as_query()),
                ("page[limit]", page_limit.as_str()),
            ]);

        let response = self.http.send(request).await.map_err(|e| {
            warn!("Location search for '{}' failed: {}", query, e);
            match e {
                RequestError::Api(api) => ResolverError::from_status(api.status, api.message),
                RequestError::Network { message } => ResolverError::unreachable(message),
                RequestError::Invalid { message } => ResolverError::internal(message),
            }
        })?;

        let body = response.bytes().await.map_err(|e| {
            ResolverError::unreachable(format!("Failed to read search response: {e}"))
        })?;

        let locations: LocationsResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!("Malformed location search response for '{}': {}", query, e);
            ResolverError::malformed("Location search response was not a list")
        })?;

        info!(
            "Found {} {} candidates for '{}'",
            locations.data.len(),
            sub_type,
            query
        );
        Ok(locations.data)
    }
}
