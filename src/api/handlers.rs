//! API request handlers

use crate::events::HubStats;
use crate::users::{User, UserError, UserId, UserInput, UserService};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Shared server state
pub struct ServerState {
    pub users: UserService,
    /// Interval between keep-alive comments on the event stream
    pub keep_alive: Duration,
}

pub type SharedState = Arc<ServerState>;

/// JSON body extractor whose rejections render as [`AppError::BadRequest`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor whose rejections render as [`AppError::BadRequest`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

// ============================================================================
// Health check
// ============================================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Live event stream subscriptions
    pub subscribers: usize,
    pub events: HubStats,
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let hub = state.users.hub();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subscribers: hub.subscriber_count(),
        events: hub.stats(),
    })
}

// ============================================================================
// Users
// ============================================================================

/// List all users
pub async fn list_users(State(state): State<SharedState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list_all().await?))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<SharedState>,
    AppPath(id): AppPath<UserId>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.get_by_id(id).await?))
}

/// Create a user; the saved record is also pushed to `/users/stream`
pub async fn create_user(
    State(state): State<SharedState>,
    AppJson(req): AppJson<UserInput>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.create(req).await?))
}

/// Replace name and email of a user
pub async fn update_user(
    State(state): State<SharedState>,
    AppPath(id): AppPath<UserId>,
    AppJson(req): AppJson<UserInput>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.update(id, req).await?))
}

pub async fn delete_user(
    State(state): State<SharedState>,
    AppPath(id): AppPath<UserId>,
) -> Result<StatusCode, AppError> {
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Error handling
// ============================================================================

/// Application error type
#[derive(Debug)]
pub enum AppError {
    Internal(anyhow::Error),
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => AppError::NotFound(err.to_string()),
            UserError::Storage(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
