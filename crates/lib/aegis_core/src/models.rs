//! Domain models shared across the session, store, and cache layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Full user record as persisted by the credential store.
///
/// `password_hash` never leaves this crate; callers get [`UserProfile`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Public projection of this user.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_verified: self.is_verified,
            created_at: self.created_at,
        }
    }
}

/// Fields needed to create a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Partial update to a user row. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Public projection of a user, also the cached profile snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Refresh token row. Rows are never deleted; revocation and expiry only
/// invalidate them logically, preserving a replay-prevention ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// A token is usable iff it is not revoked and not past its stored expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && now < self.expires_at
    }
}

/// Claims embedded in access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user ID (standard JWT `sub` claim).
    pub sub: String,
    /// User email.
    pub email: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Token ID (standard JWT `jti` claim). Unique per issued token, so
    /// two tokens minted in the same second never collide as store keys.
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_in: Duration, revoked: bool) -> (RefreshTokenRecord, DateTime<Utc>) {
        let now = Utc::now();
        (
            RefreshTokenRecord {
                token: "tok".into(),
                user_id: Uuid::new_v4(),
                expires_at: now + expires_in,
                is_revoked: revoked,
                created_at: now,
            },
            now,
        )
    }

    #[test]
    fn active_token_is_valid() {
        let (rec, now) = record(Duration::days(7), false);
        assert!(rec.is_valid_at(now));
    }

    #[test]
    fn revoked_token_is_invalid_even_before_expiry() {
        let (rec, now) = record(Duration::days(7), true);
        assert!(!rec.is_valid_at(now));
    }

    #[test]
    fn expired_token_is_invalid() {
        let (rec, now) = record(Duration::days(7), false);
        assert!(!rec.is_valid_at(now + Duration::days(8)));
    }

    #[test]
    fn profile_carries_no_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            password_hash: "$2b$12$secret".into(),
            first_name: None,
            last_name: None,
            is_active: true,
            is_verified: false,
            created_at: Utc::now(),
            last_login_at: None,
        };
        let json = serde_json::to_string(&user.profile()).unwrap();
        assert!(!json.contains("secret"));
    }
}
