//! Authentication middleware — Bearer token extraction and JWT verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use aegis_core::models::TokenClaims;
use aegis_core::store::CredentialStore;

use crate::AppState;
use crate::error::ApiError;

/// Key used to store the verified caller in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub claims: TokenClaims,
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the
/// access JWT, confirms the account still exists and is active, and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization scheme".into()))?;

    let claims = state
        .codec
        .verify_access(token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    // A token may outlive the account: re-check the store on every request.
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User not found or inactive".into()))?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id: user.id, claims });

    Ok(next.run(request).await)
}
