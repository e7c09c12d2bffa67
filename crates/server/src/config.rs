//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SCANBRIDGE_BASE_URL` - Public URL the share links point at
//!
//! ## Optional
//! - `SCANBRIDGE_HOST` - Bind address (default: 127.0.0.1)
//! - `SCANBRIDGE_PORT` - Listen port (default: 3000)
//! - `SCANBRIDGE_MAX_IMAGE_BYTES` - Encoded image payload cap
//!   (default: 2097152, i.e. 2 MiB)
//! - `SCANBRIDGE_CARD_LIMIT` - Per-owner card quota (default: 10)
//! - `CLOUDFLARE_ACCOUNT_ID` - Cloudflare account for the KV namespace
//! - `CLOUDFLARE_KV_NAMESPACE_ID` - The card namespace
//! - `CLOUDFLARE_API_TOKEN` - API token with KV read/write access
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Tracing sample rate (default: 0.0)
//!
//! The three `CLOUDFLARE_*` variables are all-or-nothing: setting only some
//! of them is a configuration error, and setting none selects the
//! non-durable in-memory fallback.

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use scanbridge_core::CardId;

/// Default cap on the encoded image payload: 2 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 2_097_152;

/// Default per-owner card quota.
pub const DEFAULT_CARD_LIMIT: usize = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Card service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, used to build card share links
    pub base_url: String,
    /// Maximum encoded image payload accepted on create
    pub max_image_bytes: usize,
    /// Per-owner card quota
    pub card_limit: usize,
    /// Cloudflare KV namespace; `None` selects the in-memory fallback
    pub cloudflare: Option<CloudflareKvConfig>,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Cloudflare KV namespace configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct CloudflareKvConfig {
    /// Cloudflare account id
    pub account_id: String,
    /// KV namespace id holding the cards
    pub namespace_id: String,
    /// API token with read/write access to the namespace
    pub api_token: SecretString,
}

impl std::fmt::Debug for CloudflareKvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareKvConfig")
            .field("account_id", &self.account_id)
            .field("namespace_id", &self.namespace_id)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// DSN; tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment name (e.g. production, staging)
    pub environment: Option<String>,
    /// Error sample rate
    pub sample_rate: f32,
    /// Performance tracing sample rate
    pub traces_sample_rate: f32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the Cloudflare variables are only partially set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("SCANBRIDGE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SCANBRIDGE_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("SCANBRIDGE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SCANBRIDGE_PORT".to_owned(), e.to_string()))?;
        let base_url = get_required_env("SCANBRIDGE_BASE_URL")?;
        let max_image_bytes = parse_env_or("SCANBRIDGE_MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?;
        let card_limit = parse_env_or("SCANBRIDGE_CARD_LIMIT", DEFAULT_CARD_LIMIT)?;

        let cloudflare = CloudflareKvConfig::from_env()?;
        let sentry = SentryConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            max_image_bytes,
            card_limit,
            cloudflare,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The shareable URL for a card, as encoded into QR codes.
    #[must_use]
    pub fn card_share_url(&self, id: &CardId) -> String {
        format!("{}/card/{id}", self.base_url.trim_end_matches('/'))
    }
}

impl CloudflareKvConfig {
    /// Load the namespace configuration; `Ok(None)` when none of the
    /// variables are set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let account_id = get_optional_env("CLOUDFLARE_ACCOUNT_ID");
        let namespace_id = get_optional_env("CLOUDFLARE_KV_NAMESPACE_ID");
        let api_token = get_optional_env("CLOUDFLARE_API_TOKEN");

        match (account_id, namespace_id, api_token) {
            (Some(account_id), Some(namespace_id), Some(api_token)) => Ok(Some(Self {
                account_id,
                namespace_id,
                api_token: SecretString::from(api_token),
            })),
            (None, None, None) => Ok(None),
            (account_id, namespace_id, _) => {
                // Some but not all set: name the first missing one.
                let missing = if account_id.is_none() {
                    "CLOUDFLARE_ACCOUNT_ID"
                } else if namespace_id.is_none() {
                    "CLOUDFLARE_KV_NAMESPACE_ID"
                } else {
                    "CLOUDFLARE_API_TOKEN"
                };
                Err(ConfigError::MissingEnvVar(missing.to_owned()))
            }
        }
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or("SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: parse_env_or("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://scanbridge.io".to_owned(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            card_limit: DEFAULT_CARD_LIMIT,
            cloudflare: None,
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_card_share_url() {
        let config = test_config();
        let id = CardId::new("abc-123");
        assert_eq!(config.card_share_url(&id), "https://scanbridge.io/card/abc-123");
    }

    #[test]
    fn test_card_share_url_trims_trailing_slash() {
        let config = ServerConfig {
            base_url: "https://scanbridge.io/".to_owned(),
            ..test_config()
        };
        let id = CardId::new("abc");
        assert_eq!(config.card_share_url(&id), "https://scanbridge.io/card/abc");
    }

    #[test]
    fn test_cloudflare_config_debug_redacts_token() {
        let config = CloudflareKvConfig {
            account_id: "acct".to_owned(),
            namespace_id: "ns".to_owned(),
            api_token: SecretString::from("super_secret_token"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("acct"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token"));
    }
}
