use folio_core::collaboration::{
    validate_lock_ttl, validate_presence_ttl, DEFAULT_LOCK_TTL_SECS, DEFAULT_PRESENCE_TTL_SECS,
};
use folio_core::versioning::{validate_max_keep, DEFAULT_MAX_VERSIONS};
use folio_core::webhooks::{
    validate_attempt_timeout, validate_max_attempts, DEFAULT_ATTEMPT_TIMEOUT_SECS,
    DEFAULT_MAX_ATTEMPTS,
};

use crate::auth::jwt::JwtConfig;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    /// Edit lock lifetime granted by acquire/refresh/takeover.
    pub lock_ttl_secs: i64,
    /// How long a heartbeat keeps a user listed as present.
    pub presence_ttl_secs: i64,
    /// Versions retained per post.
    pub version_max_keep: i64,
    /// Attempts per webhook delivery before it is exhausted.
    pub webhook_max_attempts: i32,
    /// Per-attempt webhook HTTP timeout in seconds.
    pub webhook_timeout_secs: u64,
    /// External cache purge endpoint. `None` means log-only invalidation.
    pub cache_purge_url: Option<String>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `LOCK_TTL_SECS`        | `1800`                     |
    /// | `PRESENCE_TTL_SECS`    | `120`                      |
    /// | `VERSION_MAX_KEEP`     | `50`                       |
    /// | `WEBHOOK_MAX_ATTEMPTS` | `5`                        |
    /// | `WEBHOOK_TIMEOUT_SECS` | `10` (must be under 60)    |
    /// | `CACHE_PURGE_URL`      | unset                      |
    /// | `LOG_FORMAT`           | `pretty` (`json` accepted) |
    ///
    /// # Panics
    ///
    /// Panics on unparsable or out-of-range values, and if `JWT_SECRET` is
    /// missing.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);

        let lock_ttl_secs: i64 = env_or("LOCK_TTL_SECS", DEFAULT_LOCK_TTL_SECS);
        validate_lock_ttl(lock_ttl_secs).unwrap_or_else(|e| panic!("LOCK_TTL_SECS: {e}"));

        let presence_ttl_secs: i64 = env_or("PRESENCE_TTL_SECS", DEFAULT_PRESENCE_TTL_SECS);
        validate_presence_ttl(presence_ttl_secs)
            .unwrap_or_else(|e| panic!("PRESENCE_TTL_SECS: {e}"));

        let version_max_keep: i64 = env_or("VERSION_MAX_KEEP", DEFAULT_MAX_VERSIONS);
        validate_max_keep(version_max_keep).unwrap_or_else(|e| panic!("VERSION_MAX_KEEP: {e}"));

        let webhook_max_attempts: i32 = env_or("WEBHOOK_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
        validate_max_attempts(webhook_max_attempts)
            .unwrap_or_else(|e| panic!("WEBHOOK_MAX_ATTEMPTS: {e}"));

        let webhook_timeout_secs: u64 =
            env_or("WEBHOOK_TIMEOUT_SECS", DEFAULT_ATTEMPT_TIMEOUT_SECS);
        validate_attempt_timeout(webhook_timeout_secs)
            .unwrap_or_else(|e| panic!("WEBHOOK_TIMEOUT_SECS: {e}"));

        let cache_purge_url = std::env::var("CACHE_PURGE_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            lock_ttl_secs,
            presence_ttl_secs,
            version_max_keep,
            webhook_max_attempts,
            webhook_timeout_secs,
            cache_purge_url,
            log_format,
        }
    }
}

/// Read and parse an env var, falling back to `default` when it is unset.
fn env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid number: {e}")),
        Err(_) => default,
    }
}
