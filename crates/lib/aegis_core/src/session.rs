//! Session manager — registration, login, refresh, and revocation.
//!
//! Orchestrates the credential store, token codec, password hasher, and
//! profile cache. Refresh-token validity is always re-checked against the
//! store; the token's own claims are never sole proof. Revocation is a
//! commutative, idempotent bulk update, so concurrent logout and
//! revoke-all converge to the same terminal state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::models::{NewUser, RefreshTokenRecord, User, UserPatch, UserProfile};
use crate::password::PasswordHasher;
use crate::profile::ProfileCache;
use crate::store::CredentialStore;
use crate::token::TokenCodec;

/// A fresh authentication: token pair plus the user's public projection.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Result of a refresh. `refresh_token` is `Some` only when rotation is on.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Session/token lifecycle orchestrator. Stateless per request; all shared
/// state lives behind the injected store and cache.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    profiles: Arc<ProfileCache>,
    hasher: Arc<dyn PasswordHasher>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    /// Rotate refresh tokens on every use. Off by default: a refresh token
    /// stays replayable until logout or natural expiry.
    rotate_refresh_tokens: bool,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        profiles: Arc<ProfileCache>,
        hasher: Arc<dyn PasswordHasher>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        rotate_refresh_tokens: bool,
    ) -> Self {
        Self {
            store,
            profiles,
            hasher,
            codec,
            clock,
            rotate_refresh_tokens,
        }
    }

    /// Create an account and open its first session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
                first_name: first_name.map(str::to_string),
                last_name: last_name.map(str::to_string),
            })
            .await?;

        let (access_token, refresh_token) = self.issue_token_pair(&user).await?;
        let profile = user.profile();
        self.profiles.populate(&profile).await;

        info!(user_id = %user.id, "user registered");
        Ok(AuthSession {
            access_token,
            refresh_token,
            user: profile,
        })
    }

    /// Authenticate with email and password.
    ///
    /// Check order is existence, then active flag, then password. The
    /// deactivated-account error therefore reveals that the address is
    /// registered — a long-standing trade-off kept for compatibility, not
    /// an oversight.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, refresh_token) = self.issue_token_pair(&user).await?;

        self.store
            .update_user(
                user.id,
                UserPatch {
                    last_login_at: Some(self.clock.now()),
                    ..UserPatch::default()
                },
            )
            .await?;

        let profile = user.profile();
        self.profiles.populate(&profile).await;

        info!(user_id = %user.id, "user logged in");
        Ok(AuthSession {
            access_token,
            refresh_token,
            user: profile,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The stored row is authoritative: a revoked row or a store-side
    /// expiry rejects the token even while its embedded claims still
    /// verify, which is what lets the server expire sessions early.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        let claims = self.codec.verify_refresh(refresh_token)?;

        let record = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .filter(|r| !r.is_revoked)
            .ok_or(AuthError::InvalidToken)?;

        if self.clock.now() >= record.expires_at {
            return Err(AuthError::TokenExpired);
        }

        let access_token = self.codec.issue_access(record.user_id, &claims.email)?;

        let rotated = if self.rotate_refresh_tokens {
            self.store
                .revoke_refresh_tokens(record.user_id, Some(refresh_token))
                .await?;
            let next = self.codec.issue_refresh(record.user_id, &claims.email)?;
            self.persist_refresh_token(record.user_id, &next).await?;
            Some(next)
        } else {
            None
        };

        debug!(user_id = %record.user_id, rotated = rotated.is_some(), "access token refreshed");
        Ok(RefreshedTokens {
            access_token,
            refresh_token: rotated,
        })
    }

    /// Revoke one refresh token. Idempotent: revoking an already-revoked
    /// or unknown token is a no-op, not an error.
    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
        self.store
            .revoke_refresh_tokens(user_id, Some(refresh_token))
            .await?;
        self.profiles.invalidate(user_id).await;
        info!(%user_id, "session logged out");
        Ok(())
    }

    /// Revoke every refresh token the user holds ("log out everywhere").
    pub async fn revoke_all_tokens(&self, user_id: Uuid) -> Result<(), AuthError> {
        let revoked = self.store.revoke_refresh_tokens(user_id, None).await?;
        self.profiles.invalidate(user_id).await;
        info!(%user_id, revoked, "all refresh tokens revoked");
        Ok(())
    }

    async fn issue_token_pair(&self, user: &User) -> Result<(String, String), AuthError> {
        let access = self.codec.issue_access(user.id, &user.email)?;
        let refresh = self.codec.issue_refresh(user.id, &user.email)?;
        self.persist_refresh_token(user.id, &refresh).await?;
        Ok((access, refresh))
    }

    async fn persist_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), AuthError> {
        let now: DateTime<Utc> = self.clock.now();
        self.store
            .create_refresh_token(RefreshTokenRecord {
                token: token.to_string(),
                user_id,
                expires_at: now + self.codec.refresh_ttl(),
                is_revoked: false,
                created_at: now,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::clock::ManualClock;
    use crate::password::BcryptHasher;
    use crate::store::memory::MemoryCredentialStore;
    use chrono::Duration;

    const ACCESS_TTL: i64 = 900;
    const REFRESH_TTL: i64 = 7 * 24 * 3600;

    struct Fixture {
        store: Arc<MemoryCredentialStore>,
        profiles: Arc<ProfileCache>,
        codec: Arc<TokenCodec>,
        clock: Arc<ManualClock>,
        sessions: SessionManager,
    }

    fn fixture_with_rotation(rotate: bool) -> Fixture {
        let store = Arc::new(MemoryCredentialStore::new());
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let codec = Arc::new(TokenCodec::new(
            b"access-secret",
            b"refresh-secret",
            ACCESS_TTL,
            REFRESH_TTL,
            clock.clone(),
        ));
        let profiles = Arc::new(ProfileCache::new(store.clone(), cache, 900));
        let sessions = SessionManager::new(
            store.clone(),
            profiles.clone(),
            Arc::new(BcryptHasher::new(4)),
            codec.clone(),
            clock.clone(),
            rotate,
        );
        Fixture {
            store,
            profiles,
            codec,
            clock,
            sessions,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_rotation(false)
    }

    #[tokio::test]
    async fn register_then_login_yields_matching_verified_tokens() {
        let f = fixture();
        let registered = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", Some("Ada"), None)
            .await
            .unwrap();
        let logged_in = f.sessions.login("a@b.c", "Sup3r$ecret").await.unwrap();

        let c1 = f.codec.verify_access(&registered.access_token).unwrap();
        let c2 = f.codec.verify_access(&logged_in.access_token).unwrap();
        assert_eq!(c1.sub, c2.sub);
        assert_eq!(c1.sub, registered.user.id.to_string());
        assert_eq!(registered.user.email, "a@b.c");
    }

    #[tokio::test]
    async fn duplicate_register_fails_without_mutation() {
        let f = fixture();
        f.sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();

        assert!(matches!(
            f.sessions.register("a@b.c", "0ther$ecret", None, None).await,
            Err(AuthError::AlreadyExists)
        ));
        assert_eq!(f.store.user_count(), 1);
        assert_eq!(f.store.refresh_token_count(), 1);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let f = fixture();
        f.sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();

        let wrong_password = f.sessions.login("a@b.c", "wrong").await.unwrap_err();
        let unknown_email = f.sessions.login("nobody@b.c", "wrong").await.unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        f.store
            .update_user(
                session.user.id,
                UserPatch {
                    is_active: Some(false),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            f.sessions.login("a@b.c", "Sup3r$ecret").await,
            Err(AuthError::AccountDeactivated)
        ));
    }

    #[tokio::test]
    async fn login_records_last_login_time() {
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        assert!(
            f.store
                .find_user_by_id(session.user.id)
                .await
                .unwrap()
                .unwrap()
                .last_login_at
                .is_none()
        );

        f.sessions.login("a@b.c", "Sup3r$ecret").await.unwrap();
        let user = f.store.find_user_by_id(session.user.id).await.unwrap().unwrap();
        assert_eq!(user.last_login_at, Some(f.clock.now()));
    }

    #[tokio::test]
    async fn refresh_issues_new_access_token_without_rotation() {
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();

        let refreshed = f.sessions.refresh(&session.refresh_token).await.unwrap();
        assert!(refreshed.refresh_token.is_none());
        let claims = f.codec.verify_access(&refreshed.access_token).unwrap();
        assert_eq!(claims.sub, session.user.id.to_string());

        // Same refresh token keeps working until revoked or expired.
        f.sessions.refresh(&session.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_with_rotation_retires_the_used_token() {
        let f = fixture_with_rotation(true);
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();

        // Deliberately no clock movement: a rotation within the issuance
        // second must still mint a distinct token, and the revoked row
        // must stay revoked rather than being overwritten by its
        // replacement.
        let refreshed = f.sessions.refresh(&session.refresh_token).await.unwrap();
        let next = refreshed.refresh_token.expect("rotation issues a new token");
        assert_ne!(next, session.refresh_token);
        assert_eq!(f.store.refresh_token_count(), 2);
        assert!(
            f.store
                .find_refresh_token(&session.refresh_token)
                .await
                .unwrap()
                .unwrap()
                .is_revoked
        );

        assert!(matches!(
            f.sessions.refresh(&session.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
        f.sessions.refresh(&next).await.unwrap();
    }

    #[tokio::test]
    async fn garbage_refresh_token_is_invalid() {
        let f = fixture();
        assert!(matches!(
            f.sessions.refresh("not-a-token").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn unpersisted_refresh_token_is_invalid() {
        // Cryptographically sound token with no store row behind it.
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        let orphan = f.codec.issue_refresh(session.user.id, "a@b.c").unwrap();
        assert!(matches!(
            f.sessions.refresh(&orphan).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn store_expiry_overrides_a_still_valid_claim() {
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();

        // Token whose embedded expiry is fine but whose row the server has
        // already expired.
        let token = f.codec.issue_refresh(session.user.id, "a@b.c").unwrap();
        f.store
            .create_refresh_token(RefreshTokenRecord {
                token: token.clone(),
                user_id: session.user.id,
                expires_at: f.clock.now() - Duration::seconds(1),
                is_revoked: false,
                created_at: f.clock.now() - Duration::days(8),
            })
            .await
            .unwrap();

        assert!(matches!(
            f.sessions.refresh(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn logout_revokes_only_the_matching_token() {
        let f = fixture();
        let first = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        let second = f.sessions.login("a@b.c", "Sup3r$ecret").await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        f.sessions
            .logout(first.user.id, &first.refresh_token)
            .await
            .unwrap();

        assert!(matches!(
            f.sessions.refresh(&first.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
        f.sessions.refresh(&second.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn repeated_logout_is_a_noop() {
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        f.sessions
            .logout(session.user.id, &session.refresh_token)
            .await
            .unwrap();
        f.sessions
            .logout(session.user.id, &session.refresh_token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn revoke_all_invalidates_every_issued_token() {
        let f = fixture();
        let first = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        let second = f.sessions.login("a@b.c", "Sup3r$ecret").await.unwrap();
        let third = f.sessions.login("a@b.c", "Sup3r$ecret").await.unwrap();

        f.sessions.revoke_all_tokens(first.user.id).await.unwrap();

        for token in [
            &first.refresh_token,
            &second.refresh_token,
            &third.refresh_token,
        ] {
            assert!(matches!(
                f.sessions.refresh(token).await,
                Err(AuthError::InvalidToken)
            ));
        }
        // The ledger keeps the rows.
        assert_eq!(f.store.refresh_token_count(), 3);
    }

    #[tokio::test]
    async fn register_prepopulates_the_profile_cache() {
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        assert!(f.profiles.get_profile(session.user.id).await.unwrap().cached);
    }

    #[tokio::test]
    async fn mutations_invalidate_the_profile_cache() {
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();

        f.sessions
            .logout(session.user.id, &session.refresh_token)
            .await
            .unwrap();
        assert!(!f.profiles.get_profile(session.user.id).await.unwrap().cached);
        assert!(f.profiles.get_profile(session.user.id).await.unwrap().cached);

        f.sessions.revoke_all_tokens(session.user.id).await.unwrap();
        assert!(!f.profiles.get_profile(session.user.id).await.unwrap().cached);
    }

    #[tokio::test]
    async fn naturally_expired_refresh_token_is_rejected() {
        let f = fixture();
        let session = f
            .sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        f.clock.advance(Duration::seconds(REFRESH_TTL + 1));
        // Embedded claim and stored row expire together here; the codec
        // reports it first.
        assert!(matches!(
            f.sessions.refresh(&session.refresh_token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn store_outage_is_fatal_to_login() {
        let f = fixture();
        f.sessions
            .register("a@b.c", "Sup3r$ecret", None, None)
            .await
            .unwrap();
        f.store.set_failing(true);
        assert!(matches!(
            f.sessions.login("a@b.c", "Sup3r$ecret").await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }
}
