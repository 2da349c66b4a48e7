//! API response structures

use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tasks::TimerView;
use crate::timer::{TimerError, TimerState};

/// API response structure for controller action endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerState>,
}

impl ApiResponse {
    /// Create a success response carrying the document after the action
    pub fn ok(message: String, timer: Option<TimerState>) -> Self {
        Self {
            status: "ok".to_string(),
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// Create an error response
    pub fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
            timer: None,
        }
    }
}

/// Error shape returned by handlers
pub type ApiError = (StatusCode, Json<ApiResponse>);

/// Map a timer failure onto an HTTP status and a short human-readable body
pub fn error_response(error: TimerError) -> ApiError {
    let status = match &error {
        TimerError::Forbidden => StatusCode::FORBIDDEN,
        TimerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        TimerError::Store(_) => StatusCode::BAD_GATEWAY,
        TimerError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(error.to_string())))
}

/// The timer document plus the remaining time computed at request time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerResponse {
    pub timer: TimerState,
    pub remaining_ms: u64,
    pub display: String,
}

/// Server status with the service ticker's last published view
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub view: TimerView,
    pub uptime: String,
    pub host: String,
    pub port: u16,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
