use crate::auth::ChatVerifier;
use crate::command::{CommandOutcome, CommandRouter, UNKNOWN_COMMAND};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

pub struct ChatAppState {
    pub commands: Arc<CommandRouter>,
    pub verifier: ChatVerifier,
}

/// Slash-command form fields; anything else the chat service sends is ignored
#[derive(Debug, Deserialize)]
pub struct SlashCommandForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub text: String,
}

pub fn create_chat_router(state: Arc<ChatAppState>) -> Router {
    Router::new()
        .route("/slash/:command", post(slash_command))
        .with_state(state)
}

/// POST /slash/:command
///
/// Unverified requests get 403. Everything else is answered with 200:
/// rejected or malformed commands are ordinary replies.
async fn slash_command(
    State(state): State<Arc<ChatAppState>>,
    Path(command): Path<String>,
    Form(form): Form<SlashCommandForm>,
) -> Response {
    if !state.verifier.verify(&form.token, &form.team_id) {
        warn!(command = %command, team_id = %form.team_id, "Rejected unverified chat command");
        return StatusCode::FORBIDDEN.into_response();
    }

    match state.commands.dispatch(&command, &form.text, &form.user_id) {
        CommandOutcome::Reply(reply) => Json(reply).into_response(),
        CommandOutcome::Unknown => (StatusCode::OK, UNKNOWN_COMMAND).into_response(),
    }
}
