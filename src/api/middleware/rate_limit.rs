//! Rate limiting middleware using Redis cache.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};

use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};
use crate::infra::cache::check_rate_limit;

/// Rate limit error response
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from(self.retry_after));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));

        (
            StatusCode::TOO_MANY_REQUESTS,
            headers,
            "Too many requests. Please try again later.",
        )
            .into_response()
    }
}

/// Budget applied to one group of routes
#[derive(Debug, Clone, Copy)]
struct Budget {
    scope: &'static str,
    max_requests: u64,
    window_seconds: u64,
}

const GENERAL: Budget = Budget {
    scope: "general",
    max_requests: RATE_LIMIT_REQUESTS,
    window_seconds: RATE_LIMIT_WINDOW_SECONDS,
};

const AUTH: Budget = Budget {
    scope: "auth",
    max_requests: RATE_LIMIT_AUTH_REQUESTS,
    window_seconds: RATE_LIMIT_AUTH_WINDOW_SECONDS,
};

/// Extract client identifier for rate limiting.
///
/// The connection address is used unless the peer is a trusted proxy; only
/// then are X-Forwarded-For (rightmost hop not added by a trusted proxy)
/// and X-Real-IP consulted.
fn get_client_identifier(request: &Request, trusted_proxies: &[IpAddr]) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    let Some(peer) = peer else {
        return "unknown".to_string();
    };
    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let headers = request.headers();
    if let Some(chain) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
        let client = chain
            .split(',')
            .rev()
            .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
            .find(|ip| !trusted_proxies.contains(ip));
        if let Some(client) = client {
            return client.to_string();
        }
    }

    if let Some(real_ip) = headers
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.trim().parse::<IpAddr>().ok())
    {
        return real_ip.to_string();
    }

    peer.to_string()
}

async fn enforce(
    state: &AppState,
    budget: Budget,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let client_id = get_client_identifier(&request, &state.trusted_proxies);
    let key = format!("{}:{}", budget.scope, client_id);

    let (count, allowed) = match check_rate_limit(
        state.cache.as_ref(),
        &key,
        budget.max_requests,
        budget.window_seconds,
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            // Fail closed when Redis is unavailable
            tracing::error!(error = %e, scope = budget.scope, "Rate limit check failed - denying request");
            return Err(RateLimitError {
                retry_after: budget.window_seconds,
            });
        }
    };

    if !allowed {
        tracing::warn!(
            client = %client_id,
            scope = budget.scope,
            count = count,
            "Rate limit exceeded"
        );
        return Err(RateLimitError {
            retry_after: budget.window_seconds,
        });
    }

    let mut response = next.run(request).await;

    let remaining = budget.max_requests.saturating_sub(count);
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(budget.max_requests));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));

    Ok(response)
}

/// General rate limiting middleware.
/// Limits requests to RATE_LIMIT_REQUESTS per RATE_LIMIT_WINDOW_SECONDS.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, GENERAL, request, next).await
}

/// Stricter rate limiting for authentication endpoints.
/// Limits requests to RATE_LIMIT_AUTH_REQUESTS per RATE_LIMIT_AUTH_WINDOW_SECONDS.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, AUTH, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_rate_limit_error_response() {
        let error = RateLimitError { retry_after: 60 };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "60");
    }

    fn from_peer(peer: [u8; 4], headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40_000))));
        request
    }

    #[test]
    fn test_forwarded_headers_ignored_from_untrusted_peer() {
        let request = from_peer(
            [198, 51, 100, 7],
            &[("X-Forwarded-For", "203.0.113.9"), ("X-Real-IP", "203.0.113.10")],
        );
        assert_eq!(get_client_identifier(&request, &[]), "198.51.100.7");
    }

    #[test]
    fn test_trusted_proxy_forwards_client() {
        let proxy: IpAddr = "10.0.0.1".parse().unwrap();
        let request = from_peer(
            [10, 0, 0, 1],
            &[("X-Forwarded-For", "1.2.3.4, 203.0.113.9, 10.0.0.1")],
        );
        // the leftmost hop is client supplied and not believed
        assert_eq!(get_client_identifier(&request, &[proxy]), "203.0.113.9");
    }

    #[test]
    fn test_trusted_proxy_falls_back_to_real_ip() {
        let proxy: IpAddr = "10.0.0.1".parse().unwrap();
        let request = from_peer([10, 0, 0, 1], &[("X-Real-IP", "203.0.113.10")]);
        assert_eq!(get_client_identifier(&request, &[proxy]), "203.0.113.10");
    }

    #[test]
    fn test_client_identifier_unknown() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(get_client_identifier(&request, &[]), "unknown");
    }
}
