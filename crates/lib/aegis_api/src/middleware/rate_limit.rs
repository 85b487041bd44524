//! Global request throttling and client identification.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::error::ApiError;

/// Best-effort client identity for rate-limit buckets: the first entry of
/// `X-Forwarded-For` when present, otherwise the socket peer address.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip = match forwarded {
            Some(ip) => ip,
            None => parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };

        Ok(ClientIp(ip))
    }
}

/// Axum middleware: counts every request against the global per-client window
/// and rejects with 429 once the quota is spent.
pub async fn global_rate_limit(
    State(state): State<AppState>,
    client: ClientIp,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state.global_limiter.check(&client.0).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    async fn extract(req: HttpRequest<()>) -> ClientIp {
        let (mut parts, _) = req.into_parts();
        ClientIp::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn prefers_first_forwarded_entry() {
        let req = HttpRequest::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.0, "203.0.113.9");
    }

    #[tokio::test]
    async fn falls_back_to_peer_address() {
        let mut req = HttpRequest::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("198.51.100.4:4242".parse::<SocketAddr>().unwrap()));
        assert_eq!(extract(req).await.0, "198.51.100.4");
    }

    #[tokio::test]
    async fn unknown_when_nothing_available() {
        let req = HttpRequest::builder().body(()).unwrap();
        assert_eq!(extract(req).await.0, "unknown");
    }
}
