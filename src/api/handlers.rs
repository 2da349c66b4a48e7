//! HTTP endpoint handlers
//!
//! Thin adapters between requests and the timer transitions. Explicit
//! controller actions surface their failures here as JSON error bodies;
//! only the passive auto-switch inside the ticker swallows errors.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, response::Json};
use serde::Deserialize;
use tracing::info;

use super::responses::{
    error_response, ApiError, ApiResponse, HealthResponse, StatusResponse, TimerResponse,
};
use crate::auth::{principal_from_headers, Principal};
use crate::state::AppState;
use crate::timer::math::{now_ms, to_millis};
use crate::timer::TimerError;

/// Leg durations as the minute/second text inputs a controller types.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DurationsRequest {
    pub main_minutes: String,
    pub main_seconds: String,
    pub rotation_minutes: String,
    pub rotation_seconds: String,
}

impl DurationsRequest {
    fn main_ms(&self) -> u64 {
        to_millis(&self.main_minutes, &self.main_seconds)
    }

    fn rotation_ms(&self) -> u64 {
        to_millis(&self.rotation_minutes, &self.rotation_seconds)
    }
}

fn require_principal(headers: &HeaderMap) -> Result<Principal, ApiError> {
    principal_from_headers(headers).ok_or_else(|| error_response(TimerError::Forbidden))
}

async fn action_response(
    state: &AppState,
    message: &str,
) -> Result<Json<ApiResponse>, ApiError> {
    let timer = state.timer.current().await.map_err(error_response)?;
    Ok(Json(ApiResponse::ok(message.to_string(), timer)))
}

/// Handle POST /timer/start - Begin a fresh session from the main phase
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DurationsRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = require_principal(&headers)?;
    state
        .timer
        .start(&user, request.main_ms(), request.rotation_ms())
        .await
        .map_err(error_response)?;
    info!("start requested by {}", user.uid);
    action_response(&state, "Timer started").await
}

/// Handle POST /timer/pause - Suspend the running countdown
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = require_principal(&headers)?;
    state.timer.pause(&user).await.map_err(error_response)?;
    action_response(&state, "Timer paused").await
}

/// Handle POST /timer/resume - Continue a paused countdown
pub async fn resume_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = require_principal(&headers)?;
    state.timer.resume(&user).await.map_err(error_response)?;
    action_response(&state, "Timer resumed").await
}

/// Handle POST /timer/reset - Return the timer to idle
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = require_principal(&headers)?;
    state.timer.reset(&user).await.map_err(error_response)?;
    action_response(&state, "Timer reset").await
}

/// Handle POST /timer/durations - Overwrite the configured leg durations
pub async fn durations_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DurationsRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = require_principal(&headers)?;
    state
        .timer
        .set_durations(&user, request.main_ms(), request.rotation_ms())
        .await
        .map_err(error_response)?;
    action_response(&state, "Durations saved").await
}

/// Handle GET /timer - The document and this client's view of it
///
/// Lazily provisions the document on first read; no authority needed.
pub async fn timer_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.timer.ensure_exists().await.map_err(error_response)?;
    let remaining_ms = timer.remaining_at(now_ms());
    Ok(Json(TimerResponse {
        display: crate::timer::math::format_remaining(remaining_ms as i64),
        remaining_ms,
        timer,
    }))
}

/// Handle GET /status - Server status and the service ticker's last view
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        view: state.ticker_view.borrow().clone(),
        uptime: state.uptime(),
        host: state.host.clone(),
        port: state.port,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
