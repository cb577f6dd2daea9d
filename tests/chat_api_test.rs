// Integration tests for POST /slash/:command

use acsgw::api::create_app;
use acsgw::config::Secrets;
use acsgw::devlog::DeviceLog;
use acsgw::notify::NullNotifier;
use acsgw::relay::Relay;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

const CHAT_TOKEN: &str = "chat-secret";
const TEAM: &str = "T0ACS";
const CAMERA_TOKEN: &str = "camera-secret";
const OPERATOR: &str = "U_OPERATOR";

fn create_test_app() -> (Router, Arc<Relay>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let secrets = Secrets {
        slack_verification_token: Some(CHAT_TOKEN.to_string()),
        slack_team_id: Some(TEAM.to_string()),
        acs_action_users: [OPERATOR].into_iter().collect(),
        cam_action_users: [OPERATOR].into_iter().collect(),
        camera_token: Some(CAMERA_TOKEN.to_string()),
        ..Default::default()
    };
    let relay = Arc::new(Relay::in_memory(Arc::new(NullNotifier)));
    let log = Arc::new(DeviceLog::new(dir.path().to_path_buf()));
    (create_app(relay.clone(), &secrets, log), relay, dir)
}

fn slash(command: &str, token: &str, user: &str, text: &str) -> Request<Body> {
    let body = format!(
        "token={}&team_id={}&user_id={}&text={}",
        token,
        TEAM,
        user,
        text.replace(' ', "+")
    );
    Request::builder()
        .method("POST")
        .uri(format!("/slash/{}", command))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Replies are posted in the channel with the command's text.
#[tokio::test]
async fn test_status_reply_shape() {
    let (app, _, _dir) = create_test_app();

    let response = app
        .oneshot(slash("status", CHAT_TOKEN, OPERATOR, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["response_type"], "in_channel");
    assert_eq!(json["text"], "No status");
}

/// A bad verification token is refused before any dispatch.
#[tokio::test]
async fn test_bad_token_forbidden() {
    let (app, relay, _dir) = create_test_app();

    let response = app
        .oneshot(slash("camaction", "wrong", OPERATOR, "3 on"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(relay.mailbox.pending_count(), 0);
}

/// Unknown commands answer with success status and a literal body.
#[tokio::test]
async fn test_unknown_command() {
    let (app, _, _dir) = create_test_app();

    let response = app
        .oneshot(slash("frobnicate", CHAT_TOKEN, OPERATOR, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Unknown command");
}

/// `camaction 3` is a chat reply, not a transport error.
#[tokio::test]
async fn test_malformed_camaction_is_a_reply() {
    let (app, relay, _dir) = create_test_app();

    let response = app
        .oneshot(slash("camaction", CHAT_TOKEN, OPERATOR, "3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["text"], "Invalid parameters for camera action");
    assert_eq!(relay.mailbox.pending_count(), 0);
}

/// `camaction 3 on` is drained by the first poll of camera 3 only.
#[tokio::test]
async fn test_camaction_delivered_once() {
    let (app, _, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(slash("camaction", CHAT_TOKEN, OPERATOR, "3 on"))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await["text"],
        "Camera action 'on' queued for instance 3"
    );

    let poll = || {
        Request::builder()
            .method("GET")
            .uri("/camera/3")
            .header("authorization", format!("Bearer {}", CAMERA_TOKEN))
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(poll()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["action"], "on");

    let second = app.oneshot(poll()).await.unwrap();
    assert_eq!(body_json(second).await["action"], serde_json::Value::Null);
}

/// Callers outside the allow-list get a refusal reply.
#[tokio::test]
async fn test_unlisted_caller_refused() {
    let (app, relay, _dir) = create_test_app();

    let response = app
        .oneshot(slash("action", CHAT_TOKEN, "U_STRANGER", "main unlock"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["text"],
        "You are not allowed to perform ACS actions"
    );
    assert_eq!(relay.mailbox.pending_count(), 0);
}
