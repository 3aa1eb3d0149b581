use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::{self, AppState, DEFAULT_REQUEST_TIMEOUT};
use crate::config::ResolverConfig;
use crate::provider::AmadeusClient;
use crate::resolver::AirportResolver;

/// Upper bound for one `/resolve-airports` call: a token request plus two
/// search phases, each with its full retry budget
pub fn request_timeout(config: &ResolverConfig) -> Duration {
    let timeout = Duration::from_secs(config.provider.timeout_seconds.into());
    let delay = Duration::from_millis(config.retry.delay_ms);
    let search = timeout * (config.retry.retries + 1) + delay * config.retry.retries;
    timeout + search * 2
}

/// Router with CORS applied
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::router(state).layer(cors)
}

pub async fn run(config: &ResolverConfig) -> Result<()> {
    let provider = AmadeusClient::from_config(config)?;
    if !provider.is_configured() {
        tracing::warn!("Provider credentials are missing; only local resolution will succeed");
    }

    let state = AppState::new(AirportResolver::new(Arc::new(provider)))
        .with_request_timeout(request_timeout(config));
    let app = app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Airport resolver listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout_covers_retry_budget() {
        let config = ResolverConfig::default();
        // 30s token + 2 * (3 * 30s + 2 * 4s)
        assert_eq!(request_timeout(&config), Duration::from_secs(226));
        assert_eq!(request_timeout(&config), DEFAULT_REQUEST_TIMEOUT);
    }
}
