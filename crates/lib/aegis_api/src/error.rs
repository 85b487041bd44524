//! API error types and their HTTP mapping.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use aegis_core::AuthError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP-facing errors. Domain failures pass through; the API layer adds
/// request-validation and auth-header failures of its own.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Auth(e) => {
                let status = match e {
                    AuthError::AlreadyExists => StatusCode::BAD_REQUEST,
                    AuthError::InvalidCredentials
                    | AuthError::InvalidToken
                    | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                    AuthError::AccountDeactivated => StatusCode::FORBIDDEN,
                    AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                    AuthError::NotFound => StatusCode::NOT_FOUND,
                    AuthError::StoreUnavailable(detail) => {
                        error!(%detail, "credential store unavailable");
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    AuthError::CacheUnavailable(detail) => {
                        error!(%detail, "cache unavailable");
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    AuthError::Internal(detail) => {
                        error!(%detail, "internal error");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                // Display strings are user-safe; payload detail stays in the logs.
                (status, e.to_string())
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
        });
        let mut response = (status, body).into_response();

        if let ApiError::Auth(AuthError::RateLimited { retry_after_secs }) = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
        }

        response
    }
}
