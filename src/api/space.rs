use crate::aggregate::SpaceApi;
use crate::relay::Relay;
use axum::{
    extract::State,
    http::Method,
    response::Json,
    routing::get,
    Router,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub struct SpaceAppState {
    pub relay: Arc<Relay>,
}

/// Public read-only views; CORS is open so dashboards can fetch them
pub fn create_space_router(state: Arc<SpaceAppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/doors", get(doors))
        .route("/spaceapi", get(space_api))
        .layer(cors)
        .with_state(state)
}

/// GET /doors - door name to effective door state
async fn doors(State(state): State<Arc<SpaceAppState>>) -> Json<BTreeMap<String, String>> {
    Json(state.relay.aggregator.door_snapshot())
}

/// GET /spaceapi
async fn space_api(State(state): State<Arc<SpaceAppState>>) -> Json<SpaceApi> {
    Json(state.relay.aggregator.space_api_snapshot())
}
