//! Configuration loaded from environment variables.
//!
//! # Server (`StorefrontConfig`)
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//!
//! # Client (`ClientConfig`)
//!
//! ## Optional
//! - `SHOPFRONT_API_URL` - Base URL of the persistence API (default:
//!   <http://127.0.0.1:3000>)
//! - `SHOPFRONT_API_TIMEOUT_SECS` - Request timeout in seconds (default: 30)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default base URL of the persistence API.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

/// Default per-request timeout of the persistence client.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Persistence API server configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&env_lookup)
    }

    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: get_database_url(env, "STOREFRONT_DATABASE_URL")?,
            host: parse_env_or_default(env, "STOREFRONT_HOST", "127.0.0.1")?,
            port: parse_env_or_default(env, "STOREFRONT_PORT", "3000")?,
            sentry_dsn: env("SENTRY_DSN"),
            sentry_environment: env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Persistence client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the `/api` routes are served under
    pub api_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Configuration for the API at `api_url` with the default timeout.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            timeout: DEFAULT_API_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL or timeout cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&env_lookup)
    }

    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = parse_env_or_default(env, "SHOPFRONT_API_URL", DEFAULT_API_URL)?;
        let timeout_secs: u64 = parse_env_or_default(env, "SHOPFRONT_API_TIMEOUT_SECS", "30")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(
    env: &impl Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Result<SecretString, ConfigError> {
    env(primary_key)
        .or_else(|| env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Parse an environment variable, using `default` when it is unset.
fn parse_env_or_default<T>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = env(key).unwrap_or_else(|| default.to_string());
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_server_defaults() {
        let env = lookup(&[("STOREFRONT_DATABASE_URL", "postgres://localhost/shop")]);
        let config = StorefrontConfig::from_lookup(&env).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_database_url_falls_back() {
        let env = lookup(&[("DATABASE_URL", "postgres://fallback/shop")]);
        let config = StorefrontConfig::from_lookup(&env).unwrap();
        assert_eq!(
            config.database_url.expose_secret(),
            "postgres://fallback/shop"
        );
    }

    #[test]
    fn test_database_url_required() {
        let err = StorefrontConfig::from_lookup(&lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "STOREFRONT_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let env = lookup(&[
            ("STOREFRONT_DATABASE_URL", "postgres://localhost/shop"),
            ("STOREFRONT_PORT", "eighty"),
        ]);
        let err = StorefrontConfig::from_lookup(&env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREFRONT_PORT"));
    }

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::from_lookup(&lookup(&[])).unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:3000/");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_client_overrides() {
        let env = lookup(&[
            ("SHOPFRONT_API_URL", "https://shop.example.com/backend/"),
            ("SHOPFRONT_API_TIMEOUT_SECS", "5"),
        ]);
        let config = ClientConfig::from_lookup(&env).unwrap();
        assert_eq!(config.api_url.host_str(), Some("shop.example.com"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_client_rejects_zero_timeout() {
        let env = lookup(&[("SHOPFRONT_API_TIMEOUT_SECS", "0")]);
        assert!(ClientConfig::from_lookup(&env).is_err());
    }
}
