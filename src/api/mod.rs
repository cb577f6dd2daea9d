pub mod chat;
pub mod device;
pub mod space;

use crate::auth::{ChatVerifier, DeviceAuth};
use crate::command::CommandRouter;
use crate::config::Secrets;
use crate::devlog::DeviceLog;
use crate::relay::Relay;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

pub use chat::{create_chat_router, ChatAppState};
pub use device::{create_device_router, DeviceAppState};
pub use space::{create_space_router, SpaceAppState};

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Errors surfaced by the HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    /// Credential missing or wrong
    Forbidden,
    /// Request was authenticated but names an invalid device, instance or
    /// action, or lacks a required field
    BadRequest(String),
    /// Writing to a device sink failed
    Storage(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Forbidden => write!(f, "forbidden"),
            ApiError::BadRequest(msg) => write!(f, "{}", msg),
            ApiError::Storage(msg) => write!(f, "storage failure: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Build the full HTTP surface: chat commands, device endpoints and the
/// public read-only views.
pub fn create_app(relay: Arc<Relay>, secrets: &Secrets, device_log: Arc<DeviceLog>) -> Router {
    let commands = Arc::new(CommandRouter::new(
        relay.clone(),
        secrets.acs_action_users.clone(),
        secrets.cam_action_users.clone(),
    ));

    let chat = create_chat_router(Arc::new(ChatAppState {
        commands,
        verifier: ChatVerifier::from_secrets(secrets),
    }));
    let device = create_device_router(Arc::new(DeviceAppState {
        relay: relay.clone(),
        auth: DeviceAuth::from_secrets(secrets),
        device_log,
    }));
    let space = create_space_router(Arc::new(SpaceAppState { relay }));

    Router::new().merge(chat).merge(device).merge(space)
}
