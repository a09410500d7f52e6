//! Reputation API Endpoints
//!
//! Every mutating endpoint acts on behalf of the principal bound to the
//! caller's API key. With authentication disabled the `x-principal` header
//! names the caller instead. Failures are returned as `{"error", "message"}`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::middleware::AuthenticatedPrincipal;
use crate::reputation::{
    AttestationRecord, AttestationRequest, Category, CategoryId, CategoryName, Comment,
    DecayOutcome, InputError, Principal, ReputationError, ReputationEvent, ReputationManager,
    ReputationRecord, Vote,
};

pub const PRINCIPAL_HEADER: &str = "x-principal";
pub const DEFAULT_EVENT_LIMIT: usize = 50;
pub const MAX_EVENT_LIMIT: usize = 1000;

/// API state for reputation endpoints
#[derive(Clone)]
pub struct ReputationApiState {
    pub manager: ReputationManager,
}

/// JSON error body with the matching HTTP status
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }
}

impl From<ReputationError> for ApiError {
    fn from(err: ReputationError) -> Self {
        let status = match err {
            ReputationError::Unauthorized => StatusCode::FORBIDDEN,
            ReputationError::NotFound => StatusCode::NOT_FOUND,
            ReputationError::CooldownActive => StatusCode::TOO_MANY_REQUESTS,
            ReputationError::SelfAttestation => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        Self::invalid_input(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// The principal on whose behalf the request acts
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

fn claimed_principal(parts: &Parts) -> Result<Option<Principal>, ApiError> {
    let Some(raw) = parts.headers.get(PRINCIPAL_HEADER) else {
        return Ok(None);
    };
    let raw = raw
        .to_str()
        .map_err(|_| ApiError::invalid_input("x-principal header is not valid text"))?;
    Ok(Some(Principal::new(raw)?))
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claimed = claimed_principal(parts)?;

        match parts.extensions.get::<AuthenticatedPrincipal>() {
            Some(AuthenticatedPrincipal(principal)) => match claimed {
                Some(claimed) if &claimed != principal => {
                    warn!(key_principal = %principal, claimed = %claimed, "Principal mismatch");
                    Err(ApiError::new(
                        StatusCode::FORBIDDEN,
                        "PRINCIPAL_MISMATCH",
                        "x-principal does not match the API key",
                    ))
                }
                _ => Ok(Caller(principal.clone())),
            },
            None => claimed
                .map(Caller)
                .ok_or_else(|| ApiError::invalid_input("missing x-principal header")),
        }
    }
}

// Request types

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AttestRequest {
    pub target: String,
    pub value: i64,
    pub category_id: CategoryId,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
    pub user: Option<String>,
}

// Response types

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub user: Principal,
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct AddCategoryResponse {
    pub category_id: CategoryId,
}

#[derive(Debug, Serialize)]
pub struct AttestResponse {
    pub accepted: bool,
    pub vote: Vote,
    pub score: u8,
    pub positive_count: u64,
    pub negative_count: u64,
    pub total_attestations: u64,
    pub category_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DecayResponse {
    pub user: Principal,
    pub applied: bool,
    pub days_elapsed: u64,
    pub retention_percent: Option<u64>,
    pub reputation: Option<ReputationRecord>,
}

#[derive(Debug, Serialize)]
pub struct CategoryCountResponse {
    pub user: Principal,
    pub category_id: CategoryId,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct ReceivedAttestationsResponse {
    pub user: Principal,
    pub total: usize,
    pub attestations: Vec<AttestationRecord>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub total: usize,
    pub events: Vec<ReputationEvent>,
}

// Endpoints

/// POST /reputation/initialize
pub async fn initialize(
    State(state): State<ReputationApiState>,
    Caller(caller): Caller,
) -> Json<InitializeResponse> {
    let created = state.manager.initialize_reputation(&caller).await;
    Json(InitializeResponse {
        user: caller,
        created,
    })
}

/// POST /reputation/categories
pub async fn add_category(
    State(state): State<ReputationApiState>,
    Caller(caller): Caller,
    payload: Result<Json<AddCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddCategoryResponse>), ApiError> {
    let Json(payload) = payload?;
    let name = CategoryName::new(payload.name)?;

    let category_id = state.manager.add_category(&caller, name).await?;
    Ok((StatusCode::CREATED, Json(AddCategoryResponse { category_id })))
}

/// GET /reputation/categories/{id}
pub async fn get_category(
    State(state): State<ReputationApiState>,
    id: Result<Path<CategoryId>, PathRejection>,
) -> Result<Json<Category>, ApiError> {
    let Path(id) = id?;
    state
        .manager
        .get_category(id)
        .await
        .map(Json)
        .ok_or_else(|| ReputationError::NotFound.into())
}

/// POST /reputation/attestations
pub async fn make_attestation(
    State(state): State<ReputationApiState>,
    Caller(caller): Caller,
    payload: Result<Json<AttestRequest>, JsonRejection>,
) -> Result<Json<AttestResponse>, ApiError> {
    let Json(payload) = payload?;
    let request = AttestationRequest {
        sender: caller,
        target: Principal::new(payload.target)?,
        value: payload.value,
        category_id: payload.category_id,
        comment: Comment::new(payload.comment)?,
    };

    let receipt = state.manager.make_attestation(request).await?;
    Ok(Json(AttestResponse {
        accepted: true,
        vote: receipt.vote,
        score: receipt.reputation.score,
        positive_count: receipt.reputation.positive_count,
        negative_count: receipt.reputation.negative_count,
        total_attestations: receipt.reputation.total_attestations(),
        category_count: receipt.category_count,
    }))
}

/// GET /reputation/attestations/{sender}/{target}
pub async fn get_attestation(
    State(state): State<ReputationApiState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<AttestationRecord>, ApiError> {
    let Path((sender, target)) = path?;
    let sender = Principal::new(sender)?;
    let target = Principal::new(target)?;

    state
        .manager
        .get_attestation(&sender, &target)
        .await
        .map(Json)
        .ok_or_else(|| ReputationError::NotFound.into())
}

/// POST /reputation/users/{user}/decay
///
/// Anyone may trigger decay for any user.
pub async fn apply_decay(
    State(state): State<ReputationApiState>,
    user: Result<Path<String>, PathRejection>,
) -> Result<Json<DecayResponse>, ApiError> {
    let Path(user) = user?;
    let user = Principal::new(user)?;

    let response = match state.manager.apply_reputation_decay(&user).await? {
        DecayOutcome::NotDue { days_elapsed } => DecayResponse {
            user,
            applied: false,
            days_elapsed,
            retention_percent: None,
            reputation: None,
        },
        DecayOutcome::Applied {
            days_elapsed,
            retention_percent,
            record,
        } => DecayResponse {
            user,
            applied: true,
            days_elapsed,
            retention_percent: Some(retention_percent),
            reputation: Some(record),
        },
    };

    Ok(Json(response))
}

/// GET /reputation/users/{user}
pub async fn get_reputation(
    State(state): State<ReputationApiState>,
    user: Result<Path<String>, PathRejection>,
) -> Result<Json<ReputationRecord>, ApiError> {
    let Path(user) = user?;
    let user = Principal::new(user)?;

    state
        .manager
        .get_reputation(&user)
        .await
        .map(Json)
        .ok_or_else(|| ReputationError::NotFound.into())
}

/// GET /reputation/users/{user}/categories/{id}
///
/// Unknown users and categories report a count of zero.
pub async fn get_user_category_count(
    State(state): State<ReputationApiState>,
    path: Result<Path<(String, CategoryId)>, PathRejection>,
) -> Result<Json<CategoryCountResponse>, ApiError> {
    let Path((user, category_id)) = path?;
    let user = Principal::new(user)?;
    let count = state.manager.get_user_category_count(&user, category_id).await;

    Ok(Json(CategoryCountResponse {
        user,
        category_id,
        count,
    }))
}

/// GET /reputation/users/{user}/attestations
///
/// Latest attestation from each sender about `user`.
pub async fn get_received_attestations(
    State(state): State<ReputationApiState>,
    user: Result<Path<String>, PathRejection>,
) -> Result<Json<ReceivedAttestationsResponse>, ApiError> {
    let Path(user) = user?;
    let user = Principal::new(user)?;
    let attestations = state.manager.attestations_received(&user).await;

    Ok(Json(ReceivedAttestationsResponse {
        user,
        total: attestations.len(),
        attestations,
    }))
}

/// GET /reputation/events?limit=N&user=P
pub async fn get_events(
    State(state): State<ReputationApiState>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<EventsResponse>, ApiError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .min(MAX_EVENT_LIMIT);

    let events = match query.user {
        Some(user) => {
            let user = Principal::new(user)?;
            state.manager.events_for_user(&user, limit).await
        }
        None => state.manager.recent_events(limit).await,
    };

    Ok(Json(EventsResponse {
        total: events.len(),
        events,
    }))
}

/// Create the reputation API router
pub fn create_reputation_router(state: ReputationApiState) -> Router {
    Router::new()
        .route("/initialize", post(initialize))
        .route("/categories", post(add_category))
        .route("/categories/{id}", get(get_category))
        .route("/attestations", post(make_attestation))
        .route("/attestations/{sender}/{target}", get(get_attestation))
        .route("/users/{user}", get(get_reputation))
        .route("/users/{user}/decay", post(apply_decay))
        .route("/users/{user}/attestations", get(get_received_attestations))
        .route("/users/{user}/categories/{id}", get(get_user_category_count))
        .route("/events", get(get_events))
        .with_state(state)
}
