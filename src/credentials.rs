//! Bearer-token cache for the location-search provider
//!
//! One [`CredentialCache`] is shared (by `Arc`) across every resolution. A
//! cached token is reused until 60 seconds before it expires; after that the
//! next caller performs a client-credentials grant and replaces the stored
//! credential wholesale. Two callers racing on an expired token may both
//! refresh; the last write wins and both tokens are valid.

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, instrument};

use crate::ResolverError;
use crate::config::ProviderConfig;

/// Tokens are refreshed this long before they expire
pub const EXPIRY_MARGIN_MS: i64 = 60_000;

/// Source of "now" in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A bearer token and the instant it stops being valid
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at_epoch_ms: i64,
}

impl Credential {
    /// Still usable at `now`, keeping the safety margin
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_epoch_ms - EXPIRY_MARGIN_MS
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at_epoch_ms", &self.expires_at_epoch_ms)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Lazily refreshed client-credentials token
pub struct CredentialCache {
    http: Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    clock: Arc<dyn Clock>,
    stored: Mutex<Option<Credential>>,
}

impl CredentialCache {
    pub fn new(http: Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/v1/security/oauth2/token",
                config.base_url.trim_end_matches('/')
            ),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            clock: Arc::new(SystemClock),
            stored: Mutex::new(None),
        }
    }

    /// Replace the clock, mostly useful in tests
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// True when both halves of the client credentials are present
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// The credential currently held, if any
    pub fn current(&self) -> Option<Credential> {
        self.stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Return a valid bearer token, refreshing it when missing or about to expire
    pub async fn get_token(&self) -> Result<String, ResolverError> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            error!("Provider credentials are not configured");
            return Err(ResolverError::config(
                "Location provider client id/secret are not configured",
            ));
        };

        let now = self.clock.now_millis();
        if let Some(credential) = self.current().filter(|c| c.is_fresh(now)) {
            debug!("Reusing cached provider token");
            return Ok(credential.token);
        }

        let credential = self.refresh(client_id, client_secret, now).await?;
        let token = credential.token.clone();

        *self
            .stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(credential);

        Ok(token)
    }

    #[instrument(skip_all, fields(url = %self.token_url))]
    async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        now: i64,
    ) -> Result<Credential, ResolverError> {
        info!("Requesting new provider access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Token request failed: {}", e);
                ResolverError::unreachable(format!("Token request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Provider token error ({}): {}", status, body);
            return Err(ResolverError::from_status(
                status.as_u16(),
                "Failed to get provider access token",
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            error!("Failed to parse token response: {}", e);
            ResolverError::malformed("Token response was not understood")
        })?;

        debug!("Provider token valid for {}s", token.expires_in);

        Ok(Credential {
            token: token.access_token,
            expires_at_epoch_ms: now + token.expires_in * 1000,
        })
    }
}
