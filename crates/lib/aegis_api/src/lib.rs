//! # aegis_api
//!
//! HTTP API library for the Aegis identity service.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod validate;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use aegis_core::cache::Cache;
use aegis_core::clock::Clock;
use aegis_core::password::BcryptHasher;
use aegis_core::profile::ProfileCache;
use aegis_core::ratelimit::RateLimiter;
use aegis_core::session::SessionManager;
use aegis_core::store::CredentialStore;
use aegis_core::token::TokenCodec;

use crate::config::ApiConfig;
use crate::handlers::{auth, health};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub profiles: Arc<ProfileCache>,
    pub auth_limiter: Arc<RateLimiter>,
    pub global_limiter: Arc<RateLimiter>,
    pub store: Arc<dyn CredentialStore>,
    pub codec: Arc<TokenCodec>,
    pub clock: Arc<dyn Clock>,
    pub config: ApiConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the domain services onto a store and cache backend. The clock is
    /// injected so tests can drive token and window expiry deterministically.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
        config: ApiConfig,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(
            config.access_token_secret.as_bytes(),
            config.refresh_token_secret.as_bytes(),
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
            clock.clone(),
        ));
        let profiles = Arc::new(ProfileCache::new(
            store.clone(),
            cache.clone(),
            config.profile_cache_ttl_secs,
        ));
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            profiles.clone(),
            Arc::new(BcryptHasher::new(config.bcrypt_cost)),
            codec.clone(),
            clock.clone(),
            config.rotate_refresh_tokens,
        ));
        let auth_limiter = Arc::new(RateLimiter::new(
            cache.clone(),
            "auth",
            config.auth_rate_limit.clone(),
        ));
        let global_limiter = Arc::new(RateLimiter::new(
            cache,
            "global",
            config.global_rate_limit.clone(),
        ));
        let started_at = clock.now();

        Self {
            sessions,
            profiles,
            auth_limiter,
            global_limiter,
            store,
            codec,
            clock,
            config,
            started_at,
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/revoke-all", post(auth::revoke_all_handler))
        .route("/api/auth/profile", get(auth::profile_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let api = Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::global_rate_limit,
        ));

    // /health sits outside the global limiter so probes never starve.
    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!(origin, "invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}
