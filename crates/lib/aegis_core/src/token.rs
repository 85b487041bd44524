//! Token codec — signed, expiring access and refresh tokens.
//!
//! Pure computation over the signing secrets and the injected clock; no
//! I/O. Access and refresh tokens are signed with distinct secrets so a
//! leaked access secret cannot forge refresh tokens (and vice versa).
//! Expiry is checked here against the injected clock rather than the
//! library's wall clock, keeping verification deterministic under test.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::models::TokenClaims;

/// One signing key pair plus the TTL for tokens it issues.
struct KeySet {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeySet {
    fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

/// Issues and verifies HS256 access and refresh tokens.
pub struct TokenCodec {
    access: KeySet,
    refresh: KeySet,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            access: KeySet::new(access_secret, access_ttl_secs),
            refresh: KeySet::new(refresh_secret, refresh_ttl_secs),
            clock,
        }
    }

    /// Issue a short-lived access token for `(user_id, email)`.
    pub fn issue_access(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        self.issue(&self.access, user_id, email)
    }

    /// Issue a long-lived refresh token for `(user_id, email)`.
    pub fn issue_refresh(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        self.issue(&self.refresh, user_id, email)
    }

    /// Verify an access token: signature, structure, then embedded expiry.
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(&self.access, token)
    }

    /// Verify a refresh token. Callers must still consult the credential
    /// store: a cryptographically valid refresh token may have been revoked
    /// or expired server-side.
    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(&self.refresh, token)
    }

    /// Refresh-token lifetime, for computing the stored `expires_at`.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl
    }

    fn issue(&self, keys: &KeySet, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        let now = self.clock.now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: (now + keys.ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    fn verify(&self, keys: &KeySet, token: &str) -> Result<TokenClaims, AuthError> {
        // Expiry is compared against the injected clock below, not inside
        // the library.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<TokenClaims>(token, &keys.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;

        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}
