//! Configuration management for the airport resolver
//!
//! Handles loading configuration from files and environment variables and
//! validates every setting before the service starts.

use crate::ResolverError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable prefix for structured overrides
pub const ENV_PREFIX: &str = "AIRPORT_RESOLVER";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Location provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Retry configuration for outbound calls
    #[serde(default)]
    pub retry: RetryConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Location provider settings
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the location-search provider
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Client-credentials grant id
    pub client_id: Option<String>,
    /// Client-credentials grant secret
    pub client_secret: Option<String>,
    /// Maximum candidates requested per search
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u32,
}

/// Retry settings shared by every retrying client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_provider_base_url() -> String {
    "https://test.api.amadeus.com".to_string()
}

fn default_page_limit() -> u32 {
    10
}

fn default_provider_timeout() -> u32 {
    30
}

fn default_retries() -> u32 {
    2
}

fn default_delay_ms() -> u64 {
    4000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            client_id: None,
            client_secret: None,
            page_limit: default_page_limit(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

// Keeps the secret out of logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("page_limit", &self.page_limit)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from the given file (or the default location) and
    /// environment variables
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // AIRPORT_RESOLVER__PROVIDER__CLIENT_ID and friends
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: ResolverConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_conventional_env();
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("airport-resolver").join("config.toml"))
    }

    /// Fill credentials from `AMADEUS_API_KEY` / `AMADEUS_API_SECRET` when not set otherwise
    pub fn apply_conventional_env(&mut self) {
        if self.provider.client_id.is_none() {
            self.provider.client_id = env::var("AMADEUS_API_KEY").ok();
        }
        if self.provider.client_secret.is_none() {
            self.provider.client_secret = env::var("AMADEUS_API_SECRET").ok();
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.provider.base_url.is_empty() {
            self.provider.base_url = default_provider_base_url();
        }
        if self.provider.timeout_seconds == 0 {
            self.provider.timeout_seconds = default_provider_timeout();
        }
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_credentials()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Credentials are optional at startup, but must not be blank when present
    pub fn validate_credentials(&self) -> Result<()> {
        if self.provider.client_id.as_deref().is_some_and(str::is_empty) {
            return Err(ResolverError::config(
                "Provider client id cannot be empty if provided. Either remove it or provide a valid id.",
            )
            .into());
        }

        if self.provider.client_secret.as_deref().is_some_and(str::is_empty) {
            return Err(ResolverError::config(
                "Provider client secret cannot be empty if provided. Either remove it or provide a valid secret.",
            )
            .into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.provider.timeout_seconds > 300 {
            return Err(
                ResolverError::config("Provider timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.provider.page_limit == 0 || self.provider.page_limit > 100 {
            return Err(
                ResolverError::config("Provider page limit must be between 1 and 100").into(),
            );
        }

        if self.retry.retries > 10 {
            return Err(ResolverError::config("Retry count cannot exceed 10").into());
        }

        if self.retry.delay_ms > 60_000 {
            return Err(ResolverError::config("Retry delay cannot exceed 60000 ms").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ResolverError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ResolverError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            return Err(ResolverError::config(
                "Provider base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}
