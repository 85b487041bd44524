//! Authentication request handlers.

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::rate_limit::ClientIp;
use crate::models::{
    LoginRequest, LogoutRequest, MessageResponse, ProfileResponse, RefreshRequest, RefreshResponse,
    RegisterRequest, SessionResponse,
};
use crate::validate;

/// `POST /api/auth/register` — create an account and issue a token pair.
pub async fn register_handler(
    State(state): State<AppState>,
    client: ClientIp,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    // The limiter gates the attempt itself, so malformed submissions
    // burn budget too.
    state.auth_limiter.check(&client.0).await?;

    validate::email(&body.email)?;
    validate::new_password(&body.password)?;

    let session = state
        .sessions
        .register(
            &body.email,
            &body.password,
            body.first_name.as_deref(),
            body.last_name.as_deref(),
        )
        .await?;

    state.auth_limiter.record_success(&client.0).await;

    Ok((StatusCode::CREATED, Json(SessionResponse::new(session))))
}

/// `POST /api/auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    client: ClientIp,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    state.auth_limiter.check(&client.0).await?;

    validate::email(&body.email)?;
    validate::password_present(&body.password)?;

    let session = state.sessions.login(&body.email, &body.password).await?;

    state.auth_limiter.record_success(&client.0).await;

    Ok(Json(SessionResponse::new(session)))
}

/// `POST /api/auth/refresh` — exchange a refresh token for a fresh access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let tokens = state.sessions.refresh(&body.refresh_token).await?;
    Ok(Json(RefreshResponse::new(tokens)))
}

/// `POST /api/auth/logout` — revoke one refresh token. Requires authentication.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<LogoutRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .sessions
        .logout(user.user_id, &body.refresh_token)
        .await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// `POST /api/auth/revoke-all` — revoke every refresh token for the caller.
pub async fn revoke_all_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<MessageResponse>> {
    state.sessions.revoke_all_tokens(user.user_id).await?;
    Ok(Json(MessageResponse::new("All tokens revoked successfully")))
}

/// `GET /api/auth/profile` — fetch the caller's profile, cache-aside.
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ProfileResponse>> {
    let cached = state.profiles.get_profile(user.user_id).await?;
    Ok(Json(ProfileResponse::new(cached)))
}
