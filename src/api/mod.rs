//! HTTP API for the trust ledger
//!
//! Provides:
//! - Reputation API (attestations, categories, decay, event feed)
//! - Health check
//! - Security middleware (auth, rate limiting, headers)

pub mod middleware;
pub mod reputation;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::reputation::{Principal, ReputationManager};

pub use middleware::{
    auth_middleware, body_size_middleware, logging_middleware, rate_limit_middleware,
    security_headers_middleware, RateDecision, RateLimiter, SecurityMiddlewareConfig,
    SecurityState,
};
pub use reputation::{create_reputation_router, ApiError, Caller, ReputationApiState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub administrator: Principal,
}

async fn health(State(state): State<ReputationApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        administrator: state.manager.administrator().await,
    })
}

/// Full application router with the security stack applied.
///
/// Layers run outermost first: tracing, logging, headers, rate limit,
/// body size, then authentication.
pub fn create_app(manager: ReputationManager, security: SecurityState) -> Router {
    let api_state = ReputationApiState { manager };
    let max_request_size = security.config.max_request_size;

    Router::new()
        .route("/health", get(health))
        .with_state(api_state.clone())
        .nest("/reputation", create_reputation_router(api_state))
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(from_fn_with_state(security.clone(), auth_middleware))
        .layer(from_fn_with_state(security.clone(), body_size_middleware))
        .layer(from_fn_with_state(security.clone(), rate_limit_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn_with_state(security, logging_middleware))
        .layer(TraceLayer::new_for_http())
}
