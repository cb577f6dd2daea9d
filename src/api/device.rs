use crate::api::ApiError;
use crate::auth::DeviceAuth;
use crate::device::{parse_action_for, DeviceClass, DeviceKey};
use crate::devlog::DeviceLog;
use crate::relay::{CameraPoll, CameraPowerPoll, CameraReport, DoorPoll, Relay};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct DeviceAppState {
    pub relay: Arc<Relay>,
    pub auth: DeviceAuth,
    pub device_log: Arc<DeviceLog>,
}

/// Body of a door controller request. Older firmware names the device
/// `ident`.
#[derive(Debug, Deserialize)]
pub struct DoorRequest {
    pub token: Option<String>,
    #[serde(alias = "ident")]
    pub device: Option<String>,
    pub status: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct DoorLogRequest {
    pub token: Option<String>,
    #[serde(alias = "ident")]
    pub device: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct DoorCameraPowerRequest {
    pub token: Option<String>,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CameraPowerReport {
    pub active: Option<String>,
}

pub fn create_device_router(state: Arc<DeviceAppState>) -> Router {
    Router::new()
        .route("/acsquery", post(door_query))
        .route("/acsstatus", post(door_status))
        .route("/acsheartbeat", post(door_heartbeat))
        .route("/acslog", post(door_log))
        .route("/acscamctl", post(door_camera_power))
        .route("/camera/:instance", get(camera_poll))
        .route("/camctl", get(camera_power_poll))
        .with_state(state)
}

impl DeviceAppState {
    /// Authenticate a door request and resolve the door it addresses
    fn door(&self, token: Option<&str>, device: Option<&str>) -> Result<DeviceKey, ApiError> {
        if !self.auth.door_allowed(token) {
            warn!(device = ?device, "Rejected door request with bad token");
            return Err(ApiError::Forbidden);
        }
        self.relay
            .resolve_door(device)
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

/// POST /acsquery - drain the door's pending action
async fn door_query(
    State(state): State<Arc<DeviceAppState>>,
    Json(req): Json<DoorRequest>,
) -> Result<Json<DoorPoll>, ApiError> {
    let door = state.door(req.token.as_deref(), req.device.as_deref())?;
    Ok(Json(state.relay.poll_door(&door, req.status)))
}

/// POST /acsstatus - replace the door's status record
async fn door_status(
    State(state): State<Arc<DeviceAppState>>,
    Json(req): Json<DoorRequest>,
) -> Result<StatusCode, ApiError> {
    let door = state.door(req.token.as_deref(), req.device.as_deref())?;
    let status = req
        .status
        .ok_or_else(|| ApiError::BadRequest("Missing status".to_string()))?;
    state.relay.push_door_status(&door, status);
    Ok(StatusCode::OK)
}

/// POST /acsheartbeat
async fn door_heartbeat(
    State(state): State<Arc<DeviceAppState>>,
    Json(req): Json<DoorRequest>,
) -> Result<StatusCode, ApiError> {
    let door = state.door(req.token.as_deref(), req.device.as_deref())?;
    state.relay.door_heartbeat(&door);
    Ok(StatusCode::OK)
}

/// POST /acslog - append one line to the door's hourly log file
async fn door_log(
    State(state): State<Arc<DeviceAppState>>,
    Json(req): Json<DoorLogRequest>,
) -> Result<StatusCode, ApiError> {
    let door = state.door(req.token.as_deref(), req.device.as_deref())?;
    state
        .device_log
        .append(&door, &req.timestamp, &req.text)
        .map_err(|e| {
            error!(device = %door, error = %e, "Failed to store device log line");
            ApiError::Storage("log write failed".to_string())
        })?;
    Ok(StatusCode::OK)
}

/// POST /acscamctl - door controller asks for a camera power action
async fn door_camera_power(
    State(state): State<Arc<DeviceAppState>>,
    Json(req): Json<DoorCameraPowerRequest>,
) -> Result<StatusCode, ApiError> {
    let door = state.door(req.token.as_deref(), None)?;
    let action = parse_action_for(DeviceClass::CameraPower, &req.action)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let replaced = state
        .relay
        .request_camera_power(action)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    info!(device = %door, action = %action, replaced = ?replaced, "Camera power requested by door");
    Ok(StatusCode::OK)
}

/// GET /camera/:instance - camera poll carrying its live fields as query
/// parameters
async fn camera_poll(
    State(state): State<Arc<DeviceAppState>>,
    Path(instance): Path<String>,
    headers: HeaderMap,
    Query(report): Query<CameraReport>,
) -> Result<Json<CameraPoll>, ApiError> {
    if !state.auth.camera_allowed(&headers) {
        warn!(instance = %instance, "Rejected camera poll with bad token");
        return Err(ApiError::Forbidden);
    }
    let Ok(DeviceKey::Camera(index)) = DeviceKey::camera(&instance) else {
        return Err(ApiError::BadRequest(format!(
            "Invalid camera instance '{}'",
            instance
        )));
    };
    Ok(Json(state.relay.poll_camera(index, &report)))
}

/// GET /camctl
async fn camera_power_poll(
    State(state): State<Arc<DeviceAppState>>,
    headers: HeaderMap,
    Query(report): Query<CameraPowerReport>,
) -> Result<Json<CameraPowerPoll>, ApiError> {
    if !state.auth.camera_power_allowed(&headers) {
        warn!("Rejected camera power poll with bad token");
        return Err(ApiError::Forbidden);
    }
    Ok(Json(state.relay.poll_camera_power(report.active.as_deref())))
}
