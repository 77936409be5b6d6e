//! HTTP handlers for the actuator endpoints.

use crate::actuator::{ActuatorStatus, Direction};
use crate::error::SystemError;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

/// Success payload for actuator commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResponse {
    pub message: String,
    pub degree: f64,
}

/// A failed request: status code plus a human-readable reason.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Rotation failures: the caller can act on conflicts and travel limits.
    fn from_rotate(error: SystemError) -> Self {
        let status = match &error {
            SystemError::Conflict(_) | SystemError::Range(_) => StatusCode::CONFLICT,
            SystemError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }

    fn internal(error: SystemError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

/// Toggle the loiter sweep.
pub async fn loiter(State(state): State<AppState>) -> Result<Json<CommandResponse>, ApiError> {
    let toggle = state.actuator.toggle_loiter().await.map_err(|e| {
        error!("Failed to toggle loiter: {}", e);
        ApiError::internal(e)
    })?;

    let message = if toggle.loitering {
        "Loiter started"
    } else {
        "Loiter stopped"
    };
    info!("{} at {}°", message, toggle.degree);

    Ok(Json(CommandResponse {
        message: message.to_string(),
        degree: toggle.degree,
    }))
}

pub async fn rotate_right(State(state): State<AppState>) -> Result<Json<CommandResponse>, ApiError> {
    rotate(&state, Direction::Right).await
}

pub async fn rotate_left(State(state): State<AppState>) -> Result<Json<CommandResponse>, ApiError> {
    rotate(&state, Direction::Left).await
}

async fn rotate(state: &AppState, direction: Direction) -> Result<Json<CommandResponse>, ApiError> {
    let rotation = state
        .actuator
        .rotate(direction)
        .await
        .map_err(ApiError::from_rotate)?;

    Ok(Json(CommandResponse {
        message: format!(
            "Rotated {} Degrees to the {}",
            rotation.step_degrees, rotation.direction
        ),
        degree: rotation.degree,
    }))
}

/// Current actuator angle and mode.
pub async fn status(State(state): State<AppState>) -> Result<Json<ActuatorStatus>, ApiError> {
    state
        .actuator
        .status()
        .await
        .map(Json)
        .map_err(ApiError::internal)
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "pi-sentry",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
