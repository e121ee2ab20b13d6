//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKET_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `MARKET_DATABASE_URL` - SQLite connection string, falls back to `DATABASE_URL`
//!   (default: `sqlite://data/nellore.db?mode=rwc`)
//! - `MARKET_HOST` - Bind address (default: 0.0.0.0)
//! - `MARKET_PORT` - Listen port (default: 3001)
//! - `MARKET_TOKEN_TTL` - Token lifetime such as `7d`, `12h`, `30m` (default: 7d)
//! - `MARKET_RATE_LIMIT_WINDOW_SECS` - Rate limit window (default: 900)
//! - `MARKET_RATE_LIMIT_MAX` - Requests allowed per window per client (default: 100)
//! - `MARKET_CORS_ORIGIN` - Allowed CORS origin, `*` for any (default: *)
//! - `MARKET_STATIC_DIR` - Directory served verbatim under `/static`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/nellore.db?mode=rwc";
const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "nellore-market",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// SQLite connection URL
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// HMAC key for bearer tokens
    pub token_secret: SecretString,
    pub token_ttl: Duration,
    pub rate_limit: RateLimitConfig,
    /// `None` means any origin
    pub cors_origin: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Fixed-window style limits, enforced as a token bucket that refills
/// `max_requests` tokens every `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the token secret fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = database_url_from_env();
        let host = parse_env("MARKET_HOST", "0.0.0.0")?;
        let port = parse_env("MARKET_PORT", "3001")?;

        let token_secret = get_validated_secret("MARKET_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "MARKET_TOKEN_SECRET")?;
        let token_ttl = parse_ttl(&get_env_or_default("MARKET_TOKEN_TTL", "7d")).ok_or_else(
            || {
                ConfigError::InvalidEnvVar(
                    "MARKET_TOKEN_TTL".to_string(),
                    "expected <number>[s|m|h|d]".to_string(),
                )
            },
        )?;

        let window_secs: u64 = parse_env("MARKET_RATE_LIMIT_WINDOW_SECS", "900")?;
        let max_requests: u32 = parse_env("MARKET_RATE_LIMIT_MAX", "100")?;
        if window_secs == 0 || max_requests == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MARKET_RATE_LIMIT_*".to_string(),
                "window and max must be positive".to_string(),
            ));
        }

        let cors_origin =
            get_optional_env("MARKET_CORS_ORIGIN").filter(|origin| origin.trim() != "*");

        Ok(Self {
            database_url,
            host,
            port,
            token_secret,
            token_ttl,
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(window_secs),
                max_requests,
            },
            cors_origin,
            static_dir: get_optional_env("MARKET_STATIC_DIR").map(PathBuf::from),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parses a lifetime like `7d`, `12h`, `30m`, `45s` or bare seconds.
#[must_use]
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit_secs) = match raw.char_indices().last()? {
        (i, 'd') => (raw.get(..i)?, 86_400),
        (i, 'h') => (raw.get(..i)?, 3_600),
        (i, 'm') => (raw.get(..i)?, 60),
        (i, 's') => (raw.get(..i)?, 1),
        (_, c) if c.is_ascii_digit() => (raw, 1),
        _ => return None,
    };
    let value: u64 = digits.parse().ok()?;
    if value == 0 {
        return None;
    }
    value.checked_mul(unit_secs).map(Duration::from_secs)
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// `MARKET_DATABASE_URL`, falling back to the generic `DATABASE_URL` that sqlx
/// tooling reads, then to a file under `data/`.
///
/// Shared with the CLI, which needs the database but not the token secret.
#[must_use]
pub fn database_url_from_env() -> SecretString {
    std::env::var("MARKET_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_or_else(
            |_| SecretString::from(DEFAULT_DATABASE_URL),
            SecretString::from,
        )
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // Secret lengths are tiny
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Rejects placeholder-looking and low-entropy secrets.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
