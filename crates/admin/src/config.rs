//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `COMPTOIR_API_URL` - Backend base URL (default: `http://localhost:3000/api`)
//! - `COMPTOIR_API_TOKEN` - Bearer token issued by the auth collaborator
//! - `COMPTOIR_STALE_SECS` - Seconds a cached query stays fresh (default: 300)
//! - `COMPTOIR_CACHE_CAPACITY` - Maximum number of cached queries (default: 256)
//! - `COMPTOIR_REQUEST_TIMEOUT_SECS` - Request timeout (default: none, transport default)
//! - `COMPTOIR_ROLLBACK` - `snapshot` (default) or `versioned`
//! - `COMPTOIR_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::orders::RollbackPolicy;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_STALE_SECS: u64 = 300;
const DEFAULT_CACHE_CAPACITY: u64 = 256;
const DEFAULT_IDLE_EVICTION_SECS: u64 = 30 * 60;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin client configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// REST backend configuration
    pub api: ApiConfig,
    /// Query cache configuration
    pub cache: CacheConfig,
    /// How failed status updates are rolled back
    pub rollback: RollbackPolicy,
    /// Emit JSON logs instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

/// REST backend configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: Url,
    /// Bearer token (optional - the auth collaborator may inject cookies instead)
    pub token: Option<SecretString>,
    /// Request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Configuration for an unauthenticated backend at `base_url`.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout: None,
        }
    }

    /// Returns the token as a header value, if one is configured.
    pub(crate) fn bearer(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }
}

/// Query cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a fetched query is served without refetching
    pub stale_after: Duration,
    /// Entries not read for this long are evicted
    pub idle_eviction: Duration,
    /// Maximum number of cached queries
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(DEFAULT_STALE_SECS),
            idle_eviction: Duration::from_secs(DEFAULT_IDLE_EVICTION_SECS),
            max_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = get("COMPTOIR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = parse_base_url(&base_url)?;

        let token = get("COMPTOIR_API_TOKEN").map(|token| {
            if let Err(e) = validate_secret_strength(&token, "COMPTOIR_API_TOKEN") {
                tracing::warn!("COMPTOIR_API_TOKEN validation warning: {e}");
            }
            SecretString::from(token)
        });

        let timeout = get("COMPTOIR_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_secs(&raw, "COMPTOIR_REQUEST_TIMEOUT_SECS"))
            .transpose()?;

        let stale_after = get("COMPTOIR_STALE_SECS")
            .map(|raw| parse_secs(&raw, "COMPTOIR_STALE_SECS"))
            .transpose()?
            .unwrap_or(Duration::from_secs(DEFAULT_STALE_SECS));

        let max_capacity = get("COMPTOIR_CACHE_CAPACITY")
            .map(|raw| {
                raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("COMPTOIR_CACHE_CAPACITY".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_CACHE_CAPACITY);

        let rollback = get("COMPTOIR_ROLLBACK")
            .map(|raw| {
                raw.parse::<RollbackPolicy>()
                    .map_err(|e| ConfigError::InvalidEnvVar("COMPTOIR_ROLLBACK".to_string(), e))
            })
            .transpose()?
            .unwrap_or_default();

        let sentry_sample_rate = get("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            api: ApiConfig {
                base_url,
                token,
                timeout,
            },
            cache: CacheConfig {
                stale_after,
                max_capacity,
                ..CacheConfig::default()
            },
            rollback,
            log_json: get("COMPTOIR_LOG_JSON").is_some(),
            sentry_dsn: get("SENTRY_DSN"),
            sentry_environment: get("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the backend base URL, forcing a trailing slash so relative joins
/// keep the path prefix (`/api/` + `orders` = `/api/orders`).
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidEnvVar("COMPTOIR_API_URL".to_string(), e.to_string()))
}

/// Parse a whole number of seconds.
fn parse_secs(raw: &str, key: &str) -> Result<Duration, ConfigError> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AdminConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:3000/api/");
        assert!(config.api.token.is_none());
        assert!(config.api.timeout.is_none());
        assert_eq!(config.cache.stale_after, Duration::from_secs(300));
        assert_eq!(config.cache.max_capacity, 256);
        assert_eq!(config.rollback, RollbackPolicy::Snapshot);
        assert!(!config.log_json);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AdminConfig::from_lookup(lookup(&[
            ("COMPTOIR_API_URL", "https://api.comptoir.ci/v1/"),
            ("COMPTOIR_STALE_SECS", "60"),
            ("COMPTOIR_REQUEST_TIMEOUT_SECS", "15"),
            ("COMPTOIR_ROLLBACK", "versioned"),
            ("COMPTOIR_LOG_JSON", "1"),
        ]))
        .unwrap();
        assert_eq!(config.api.base_url.as_str(), "https://api.comptoir.ci/v1/");
        assert_eq!(config.cache.stale_after, Duration::from_secs(60));
        assert_eq!(config.api.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.rollback, RollbackPolicy::Versioned);
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = AdminConfig::from_lookup(lookup(&[("COMPTOIR_STALE_SECS", "five")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "COMPTOIR_STALE_SECS"));

        let err = AdminConfig::from_lookup(lookup(&[("COMPTOIR_API_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        let err = AdminConfig::from_lookup(lookup(&[("COMPTOIR_ROLLBACK", "optimistic")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let config = AdminConfig::from_lookup(lookup(&[(
            "COMPTOIR_API_TOKEN",
            "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6",
        )]))
        .unwrap();

        let debug_output = format!("{:?}", config.api);
        assert!(debug_output.contains("localhost:3000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("aB3$xY9"));
        assert_eq!(
            config.api.bearer().as_deref(),
            Some("Bearer aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6")
        );
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-api-token-here", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }
}
