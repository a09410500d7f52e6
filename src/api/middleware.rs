//! Security Middleware for the Trust Ledger API
//!
//! Provides:
//! - API key authentication
//! - Rate limiting per client IP
//! - Request body size limits
//! - Security headers
//! - Request logging with address masking

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{sanitize_for_logging, ApiCredential, LedgerConfig};
use crate::reputation::Principal;

/// Security configuration for middleware
#[derive(Debug, Clone)]
pub struct SecurityMiddlewareConfig {
    pub enable_auth: bool,
    pub api_keys: Vec<ApiCredential>,
    /// Requests per minute per client IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
    pub log_requests: bool,
    pub sanitize_logs: bool,
    /// Path prefixes that skip authentication
    pub public_paths: Vec<String>,
}

impl Default for SecurityMiddlewareConfig {
    fn default() -> Self {
        Self {
            enable_auth: true,
            api_keys: Vec::new(),
            rate_limit_per_minute: 120,
            max_request_size: 64 * 1024,
            log_requests: false,
            sanitize_logs: true,
            public_paths: vec!["/health".to_string()],
        }
    }
}

impl From<&LedgerConfig> for SecurityMiddlewareConfig {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            enable_auth: config.security.enable_auth,
            api_keys: config.security.api_keys.clone(),
            rate_limit_per_minute: config.security.rate_limit_per_minute,
            max_request_size: config.security.max_request_size,
            log_requests: config.logging.log_requests,
            sanitize_logs: config.logging.sanitize_logs,
            ..Self::default()
        }
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_after_secs: u64,
}

/// Fixed-window request counter per client IP
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            windows: DashMap::new(),
            limit: requests_per_minute,
            window: Duration::from_secs(60),
        }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        let now = Instant::now();
        let mut entry = self.windows.entry(client.to_string()).or_insert((0, now));
        let (count, started) = entry.value_mut();

        if now.duration_since(*started) >= self.window {
            *count = 0;
            *started = now;
        }

        let reset_after_secs = self
            .window
            .saturating_sub(now.duration_since(*started))
            .as_secs();

        if *count >= self.limit {
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_after_secs,
            };
        }

        *count += 1;
        RateDecision {
            allowed: true,
            remaining: self.limit - *count,
            reset_after_secs,
        }
    }

    /// Drop windows idle for more than two periods
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, (_, started)| now.duration_since(*started) < self.window * 2);
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Shared state for security middleware
#[derive(Clone)]
pub struct SecurityState {
    pub config: SecurityMiddlewareConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SecurityState {
    pub fn new(config: SecurityMiddlewareConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self {
            config,
            rate_limiter,
        }
    }
}

/// Client IP from proxy headers, falling back to the socket address
fn client_ip(request: &Request) -> String {
    let headers = request.headers();

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return ip.trim().to_string();
    }

    if let Some(ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return ip.trim().to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn presented_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-api-key")
        .or_else(|| headers.get("authorization"))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start_matches("Bearer ").trim())
}

fn is_public_path(path: &str, public_paths: &[String]) -> bool {
    public_paths.iter().any(|p| path.starts_with(p.as_str()))
}

/// Principal bound to the API key that authenticated the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Authentication middleware
///
/// On success the key's principal is attached to the request as an
/// [`AuthenticatedPrincipal`] extension.
pub async fn auth_middleware(
    State(state): State<SecurityState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = request.uri().path().to_string();

    if !state.config.enable_auth || is_public_path(&path, &state.config.public_paths) {
        return Ok(next.run(request).await);
    }

    let principal = match presented_api_key(request.headers()) {
        Some(key) => state
            .config
            .api_keys
            .iter()
            .find(|credential| credential.key == key)
            .map(|credential| credential.principal.clone()),
        None => {
            warn!(path = %path, "Missing API key");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let Some(principal) = principal else {
        warn!(path = %path, "Invalid API key");
        return Err(StatusCode::UNAUTHORIZED);
    };

    debug!(path = %path, principal = %principal, "API key accepted");
    request
        .extensions_mut()
        .insert(AuthenticatedPrincipal(principal));
    Ok(next.run(request).await)
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);
    let decision = state.rate_limiter.check(&client);
    let limit = HeaderValue::from(state.config.rate_limit_per_minute);

    if !decision.allowed {
        warn!(
            client = %sanitize_client(&state, &client),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );

        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", limit);
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
        headers.insert("Retry-After", HeaderValue::from(decision.reset_after_secs));
        return response;
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", limit);
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(decision.reset_after_secs));
    response
}

/// Reject bodies whose declared length exceeds the limit
pub async fn body_size_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let declared = request
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared {
        if length > state.config.max_request_size {
            warn!(
                length,
                max = state.config.max_request_size,
                "Request body too large"
            );
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
    }

    Ok(next.run(request).await)
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    // Reputation reads must never be served stale from a cache
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.remove("Server");

    response
}

fn sanitize_client(state: &SecurityState, client: &str) -> String {
    if state.config.sanitize_logs {
        sanitize_for_logging(client)
    } else {
        client.to_string()
    }
}

/// Request logging middleware
pub async fn logging_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.log_requests {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = sanitize_client(&state, &client_ip(&request));

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        error!(method = %method, path = %path, status, duration_ms, client = %client, "Request failed");
    } else if response.status().is_client_error() {
        warn!(method = %method, path = %path, status, duration_ms, client = %client, "Client error");
    } else {
        info!(method = %method, path = %path, status, duration_ms, client = %client, "Request completed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter() {
        let limiter = RateLimiter::new(3);

        assert_eq!(limiter.check("10.0.0.1").remaining, 2);
        assert!(limiter.check("10.0.0.1").allowed);
        assert!(limiter.check("10.0.0.1").allowed);

        let denied = limiter.check("10.0.0.1");
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);

        // Other clients have their own window
        assert!(limiter.check("10.0.0.2").allowed);
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_presented_api_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_api_key(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer secret-key"));
        assert_eq!(presented_api_key(&headers), Some("secret-key"));

        headers.insert("x-api-key", HeaderValue::from_static("direct-key"));
        assert_eq!(presented_api_key(&headers), Some("direct-key"));
    }

    #[test]
    fn test_is_public_path() {
        let public = vec!["/health".to_string()];
        assert!(is_public_path("/health", &public));
        assert!(!is_public_path("/reputation/users/bob", &public));
    }

    #[test]
    fn test_config_from_ledger_config() {
        let mut config = LedgerConfig::default();
        config.security.api_keys = vec!["alice:k".parse().unwrap()];
        config.security.rate_limit_per_minute = 7;

        let security = SecurityMiddlewareConfig::from(&config);
        assert_eq!(security.rate_limit_per_minute, 7);
        assert_eq!(security.api_keys[0].principal.as_str(), "alice");
        assert_eq!(security.public_paths, vec!["/health".to_string()]);
    }
}
