//! Environment-driven configuration.
//!
//! [`RailConfig::from_env`] reads a `.env` file when one is present, then the
//! process environment. Tests use [`RailConfig::from_lookup`] to supply
//! variables without touching either.

use core::time::Duration;

use thiserror::Error;
use url::Url;

use crate::async_ext::DEFAULT_TIMEOUT;
use crate::backend::BackendConfig;
use crate::logging::{LogConfig, LogFormat};
use crate::telemetry::TelemetryConfig;

pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailConfig {
    pub backend: BackendConfig,
    pub telemetry: TelemetryConfig,
    pub geocoder_url: Url,
    pub log: LogConfig,
}

impl RailConfig {
    /// Loads `.env` (a missing file is fine) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {},
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let url = var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let url = parse_url("SUPABASE_URL", &url)?;
        let anon_key = var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|err| {
                ConfigError::Invalid { name: "REQUEST_TIMEOUT_SECS", reason: err.to_string() }
            })?,
            None => DEFAULT_TIMEOUT,
        };

        let geocoder_url = match var("GEOCODER_URL") {
            Some(raw) => parse_url("GEOCODER_URL", &raw)?,
            None => parse_url("GEOCODER_URL", DEFAULT_GEOCODER_URL)?,
        };

        let telemetry = TelemetryConfig {
            dsn: var("SENTRY_DSN"),
            environment: var("APP_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_owned()),
            release: var("APP_RELEASE"),
        };

        let log = LogConfig {
            format: var("LOG_FORMAT").map(|raw| LogFormat::parse(&raw)).unwrap_or_default(),
            ..LogConfig::default()
        };

        Ok(Self {
            backend: BackendConfig::new(url, anon_key).with_timeout(timeout),
            telemetry,
            geocoder_url,
            log,
        })
    }

    #[inline]
    pub fn is_development(&self) -> bool {
        self.telemetry.environment == DEFAULT_ENVIRONMENT
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|err| ConfigError::Invalid { name, reason: err.to_string() })
}
