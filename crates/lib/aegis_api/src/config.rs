//! API server configuration.

use std::env;
use std::str::FromStr;

use aegis_core::ratelimit::RateLimitConfig;

/// Configuration for the API server. Secrets are resolved once at startup
/// and treated as read-only for the life of the process.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Signing secret for access tokens.
    pub access_token_secret: String,
    /// Signing secret for refresh tokens. Distinct from the access secret
    /// so a leak of one cannot forge the other.
    pub refresh_token_secret: String,
    /// Access-token lifetime in seconds.
    pub access_token_ttl_secs: i64,
    /// Refresh-token lifetime in seconds.
    pub refresh_token_ttl_secs: i64,
    /// bcrypt work factor for password hashing.
    pub bcrypt_cost: u32,
    /// Profile snapshot TTL in seconds.
    pub profile_cache_ttl_secs: u64,
    /// Limiter guarding register/login.
    pub auth_rate_limit: RateLimitConfig,
    /// Coarse limiter applied to every route.
    pub global_rate_limit: RateLimitConfig,
    /// Rotate refresh tokens on each use.
    pub rotate_refresh_tokens: bool,
    /// Allowed CORS origin, or "*" for any.
    pub cors_origin: String,
}

impl ApiConfig {
    /// Reads configuration from environment variables with development
    /// defaults.
    ///
    /// | Variable                        | Default                              |
    /// |---------------------------------|--------------------------------------|
    /// | `BIND_ADDR`                     | `127.0.0.1:3000`                     |
    /// | `DATABASE_URL`                  | `postgres://localhost:5432/aegis`    |
    /// | `ACCESS_TOKEN_SECRET`           | dev placeholder                      |
    /// | `REFRESH_TOKEN_SECRET`          | dev placeholder                      |
    /// | `ACCESS_TOKEN_TTL_SECS`         | `900` (15 min)                       |
    /// | `REFRESH_TOKEN_TTL_SECS`        | `604800` (7 days)                    |
    /// | `BCRYPT_COST`                   | `12`                                 |
    /// | `PROFILE_CACHE_TTL_SECS`        | `900`                                |
    /// | `AUTH_RATE_LIMIT_MAX`           | `5`                                  |
    /// | `AUTH_RATE_LIMIT_WINDOW_SECS`   | `900`                                |
    /// | `GLOBAL_RATE_LIMIT_MAX`         | `100`                                |
    /// | `GLOBAL_RATE_LIMIT_WINDOW_SECS` | `900`                                |
    /// | `ROTATE_REFRESH_TOKENS`         | `false`                              |
    /// | `CORS_ORIGIN`                   | `http://localhost:3000`              |
    pub fn from_env() -> Self {
        let auth_defaults = RateLimitConfig::auth_default();
        let global_defaults = RateLimitConfig::global_default();
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/aegis".into()),
            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .unwrap_or_else(|_| "aegis-dev-access-secret-change-in-production".into()),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .unwrap_or_else(|_| "aegis-dev-refresh-secret-change-in-production".into()),
            access_token_ttl_secs: env_parsed("ACCESS_TOKEN_TTL_SECS", 900),
            refresh_token_ttl_secs: env_parsed("REFRESH_TOKEN_TTL_SECS", 7 * 24 * 3600),
            bcrypt_cost: env_parsed("BCRYPT_COST", aegis_core::password::DEFAULT_BCRYPT_COST),
            profile_cache_ttl_secs: env_parsed("PROFILE_CACHE_TTL_SECS", 900),
            auth_rate_limit: RateLimitConfig {
                max_requests: env_parsed("AUTH_RATE_LIMIT_MAX", auth_defaults.max_requests),
                window_secs: env_parsed(
                    "AUTH_RATE_LIMIT_WINDOW_SECS",
                    auth_defaults.window_secs,
                ),
                skip_successful: auth_defaults.skip_successful,
            },
            global_rate_limit: RateLimitConfig {
                max_requests: env_parsed("GLOBAL_RATE_LIMIT_MAX", global_defaults.max_requests),
                window_secs: env_parsed(
                    "GLOBAL_RATE_LIMIT_WINDOW_SECS",
                    global_defaults.window_secs,
                ),
                skip_successful: global_defaults.skip_successful,
            },
            rotate_refresh_tokens: env_parsed("ROTATE_REFRESH_TOKENS", false),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".into()),
        }
    }
}

fn env_parsed<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
