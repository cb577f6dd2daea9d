// Integration tests for the door controller, camera and camera power endpoints

use acsgw::api::create_app;
use acsgw::config::Secrets;
use acsgw::device::{Action, DeviceClass, DeviceKey};
use acsgw::devlog::DeviceLog;
use acsgw::mailbox::{Address, PendingAction};
use acsgw::notify::RecordingNotifier;
use acsgw::relay::Relay;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ACS_TOKEN: &str = "acs-secret";
const CAMERA_TOKEN: &str = "camera-secret";
const CAMCTL_TOKEN: &str = "camctl-secret";

struct TestApp {
    app: Router,
    relay: Arc<Relay>,
    notifier: Arc<RecordingNotifier>,
    dir: tempfile::TempDir,
}

fn create_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let secrets = Secrets {
        acs_token: Some(ACS_TOKEN.to_string()),
        camera_token: Some(CAMERA_TOKEN.to_string()),
        camctl_token: Some(CAMCTL_TOKEN.to_string()),
        ..Default::default()
    };
    let notifier = Arc::new(RecordingNotifier::new());
    let relay = Arc::new(Relay::in_memory(notifier.clone()));
    let log = Arc::new(DeviceLog::new(dir.path().join("logs")));
    TestApp {
        app: create_app(relay.clone(), &secrets, log),
        relay,
        notifier,
        dir,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_bearer(uri: &str, header: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn query(app: &Router, device: &str) -> Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/acsquery",
            json!({"token": ACS_TOKEN, "device": device}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Lock for main is delivered to main only; side still learns the policy.
#[tokio::test]
async fn test_main_and_side_door_polls() {
    let t = create_test_app();
    t.relay.mailbox.enqueue(
        Address::Device("main".to_string()),
        PendingAction::new(Action::Lock, None),
    );

    let main = query(&t.app, "main").await;
    assert_eq!(main, json!({"action": "lock", "arg": null, "allow_open": false}));

    let side = query(&t.app, "side").await;
    assert_eq!(side, json!({"action": null, "arg": null, "allow_open": false}));

    let again = query(&t.app, "main").await;
    assert_eq!(again["action"], Value::Null);
    assert_eq!(again["allow_open"], false);
}

/// Door requests without a device name address the main door.
#[tokio::test]
async fn test_status_push_defaults_to_main_door() {
    let t = create_test_app();

    let response = t
        .app
        .clone()
        .oneshot(post_json(
            "/acsstatus",
            json!({"token": ACS_TOKEN, "status": {"door": "locked"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = t
        .relay
        .status
        .read_status(&DeviceKey::Door("main".to_string()))
        .unwrap();
    assert_eq!(record.field_str("door"), Some("locked"));
}

#[tokio::test]
async fn test_status_push_requires_status() {
    let t = create_test_app();

    let response = t
        .app
        .oneshot(post_json("/acsstatus", json!({"token": ACS_TOKEN})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_door_bad_token_forbidden() {
    let t = create_test_app();

    for uri in ["/acsquery", "/acsstatus", "/acsheartbeat", "/acslog", "/acscamctl"] {
        let response = t
            .app
            .clone()
            .oneshot(post_json(uri, json!({"token": "nope", "status": {}})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
    assert!(t.relay.status.read_all().is_empty());
}

#[tokio::test]
async fn test_invalid_device_name_rejected() {
    let t = create_test_app();

    let response = t
        .app
        .oneshot(post_json(
            "/acsheartbeat",
            json!({"token": ACS_TOKEN, "ident": "../etc"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("../etc"));
}

/// Heartbeats accept the legacy `ident` field.
#[tokio::test]
async fn test_heartbeat_with_ident() {
    let t = create_test_app();

    let response = t
        .app
        .oneshot(post_json(
            "/acsheartbeat",
            json!({"token": ACS_TOKEN, "ident": "woodshop"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let key = DeviceKey::Door("woodshop".to_string());
    assert!(t.relay.status.read_status(&key).is_some());
    assert!(t.relay.liveness.last_seen(&key).is_some());
}

#[tokio::test]
async fn test_log_upload_written() {
    let t = create_test_app();

    let response = t
        .app
        .oneshot(post_json(
            "/acslog",
            json!({"token": ACS_TOKEN, "device": "main", "timestamp": "09:00:01", "text": "card accepted"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries: Vec<_> = std::fs::read_dir(t.dir.path().join("logs"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    let name = entries[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("main-") && name.ends_with(".log"));
    assert_eq!(
        std::fs::read_to_string(&entries[0]).unwrap(),
        "09:00:01 card accepted\n"
    );
}

async fn request_power(app: &Router, action: &str) -> StatusCode {
    app.clone()
        .oneshot(post_json(
            "/acscamctl",
            json!({"token": ACS_TOKEN, "action": action}),
        ))
        .await
        .unwrap()
        .status()
}

async fn poll_power(app: &Router) -> Value {
    let response = app
        .clone()
        .oneshot(get_with_bearer("/camctl", "authorization", CAMCTL_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["action"].clone()
}

/// Operator actions reach the power unit first; the door request follows.
#[tokio::test]
async fn test_door_camera_power_request_after_operator_action() {
    let t = create_test_app();
    assert_eq!(request_power(&t.app, "lock").await, StatusCode::BAD_REQUEST);

    t.relay.mailbox.enqueue(
        Address::Class(DeviceClass::CameraPower),
        PendingAction::new(Action::Off, None),
    );
    assert_eq!(request_power(&t.app, "on").await, StatusCode::OK);

    assert_eq!(poll_power(&t.app).await, "off");
    assert_eq!(poll_power(&t.app).await, "on");
    assert_eq!(poll_power(&t.app).await, Value::Null);
}

/// A newer door request replaces an undelivered older one.
#[tokio::test]
async fn test_latest_door_camera_power_request_delivered() {
    let t = create_test_app();
    assert_eq!(request_power(&t.app, "on").await, StatusCode::OK);
    assert_eq!(request_power(&t.app, "off").await, StatusCode::OK);

    assert_eq!(poll_power(&t.app).await, "off");
    assert_eq!(poll_power(&t.app).await, Value::Null);
}

/// Camera polls merge their query fields and return camera defaults.
#[tokio::test]
async fn test_camera_poll_merges_report() {
    let t = create_test_app();

    let response = t
        .app
        .oneshot(get_with_bearer(
            "/camera/2?active=1&version=1.4&last_pic=08:59",
            "authorization",
            CAMERA_TOKEN,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["keepalive"], 60);
    assert_eq!(json["action"], Value::Null);

    let record = t.relay.status.read_status(&DeviceKey::Camera(2)).unwrap();
    assert_eq!(record.field_str("active"), Some("1"));
    assert_eq!(record.field_str("version"), Some("1.4"));
    assert_eq!(record.field_str("last picture"), Some("08:59"));
}

#[tokio::test]
async fn test_camera_poll_rejections() {
    let t = create_test_app();

    let response = t
        .app
        .clone()
        .oneshot(get_with_bearer("/camera/abc", "authorization", CAMERA_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t
        .app
        .clone()
        .oneshot(get_with_bearer("/camera/1", "authorization", CAMCTL_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/camera/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// The camera power unit authenticates with the `Authentication` header.
#[tokio::test]
async fn test_camera_power_poll() {
    let t = create_test_app();
    t.relay.mailbox.enqueue(
        Address::Class(DeviceClass::CameraPower),
        PendingAction::new(Action::Reboot, None),
    );

    let response = t
        .app
        .clone()
        .oneshot(get_with_bearer("/camctl?active=1", "authentication", CAMCTL_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"action": "reboot", "arg": null})
    );

    let response = t
        .app
        .oneshot(get_with_bearer("/camctl?active=1", "authentication", CAMCTL_TOKEN))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["action"], Value::Null);

    assert_eq!(t.notifier.messages(), vec![":camera: Cameras are on"]);
}
