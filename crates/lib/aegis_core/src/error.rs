//! Domain error taxonomy.
//!
//! Expected business outcomes (duplicate email, bad credentials, revoked
//! token) are variants here, not panics. Display strings are stable and
//! user-safe; transport details ride in the variant payloads and are only
//! ever logged, never surfaced to callers.

use thiserror::Error;

/// Errors produced by the session, rate-limit, and profile-cache cores.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists")]
    AlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    #[error("User not found")]
    NotFound,

    /// The credential store could not be reached. Fatal to the request;
    /// never retried here so the boundary layer owns backoff policy.
    #[error("Credential store unavailable")]
    StoreUnavailable(String),

    /// The cache could not be reached. Non-fatal on profile reads,
    /// fail-closed on the rate-limit path.
    #[error("Cache unavailable")]
    CacheUnavailable(String),

    #[error("Internal error")]
    Internal(String),
}

/// Errors from the key-value cache boundary.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

impl From<CacheError> for AuthError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Unavailable(detail) => AuthError::CacheUnavailable(detail),
        }
    }
}
