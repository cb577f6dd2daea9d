use super::*;
use serde_json::{json, Map, Value};

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn setup() -> (Arc<StatusStore>, Aggregator) {
    let liveness = Arc::new(LivenessTracker::in_memory());
    let store = Arc::new(StatusStore::in_memory(liveness.clone()));
    let aggregator = Aggregator::new(store.clone(), liveness, SpaceConfig::default());
    (store, aggregator)
}

fn door(name: &str) -> DeviceKey {
    DeviceKey::Door(name.to_string())
}

#[test]
fn test_operator_summary_empty() {
    let (_, aggregator) = setup();
    assert_eq!(aggregator.operator_summary(), NO_STATUS);
}

#[test]
fn test_operator_summary_lists_every_field() {
    let (store, aggregator) = setup();
    store.write_status(
        &door("main"),
        fields(json!({"door": "locked", "battery_level": 80})),
    );
    store.write_status(&door("woodshop"), fields(json!({"door": "closed"})));
    store.write_status(&DeviceKey::Camera(1), fields(json!({"active": "1"})));

    let summary = aggregator.operator_summary();
    let blocks: Vec<&str> = summary.split("\n\n").collect();
    assert_eq!(blocks.len(), 2);

    let main: Vec<&str> = blocks[0].lines().collect();
    assert_eq!(main[0], "*Main*");
    assert_eq!(main[1], "Battery level: 80");
    assert_eq!(main[2], "Door: locked");
    assert!(main[3].starts_with("Last update: "));
    assert!(main[4].starts_with("Last seen: "));

    assert!(blocks[1].starts_with("*Woodshop*\nDoor: closed\n"));
    // Camera records are not part of the door summary
    assert!(!summary.contains("Active"));
}

#[test]
fn test_camera_summary_empty() {
    let (store, aggregator) = setup();
    store.write_status(&door("main"), fields(json!({"door": "locked"})));
    assert_eq!(aggregator.camera_summary(), NO_STATUS);
}

#[test]
fn test_camera_summary_abbreviates_and_sorts() {
    let (store, aggregator) = setup();
    store.write_status(
        &DeviceKey::Camera(10),
        fields(json!({"active": "0", "version": "2.0"})),
    );
    store.write_status(
        &DeviceKey::Camera(2),
        fields(json!({
            "active": "1",
            "continuous mode": "0",
            "last picture": "12:00",
            "version": "1.4"
        })),
    );
    store.write_status(&DeviceKey::CameraPower, fields(json!({"active": "1"})));

    let summary = aggregator.camera_summary();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);

    assert!(lines[0].starts_with("2: Active, CM: 0, LP: 12:00, H: "));
    assert!(lines[0].ends_with(", V: 1.4"));
    assert!(lines[1].starts_with("10: Inactive, H: "));
    assert!(lines[1].ends_with(", V: 2.0"));
    assert!(lines[2].starts_with("Power: Active, H: "));
}

#[test]
fn test_door_snapshot_reports_door_field() {
    let (store, aggregator) = setup();
    store.write_status(&door("main"), fields(json!({"door": "locked", "space": "closed"})));
    store.write_status(&door("side"), fields(json!({"door": "open"})));
    store.write_status(&door("shed"), fields(json!({"battery": 10})));
    store.write_status(&DeviceKey::Camera(1), fields(json!({"door": "weird"})));

    let snapshot = aggregator.door_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["main"], "locked");
    assert_eq!(snapshot["side"], "open");
}

#[test]
fn test_space_open_forces_unlocked() {
    let (store, aggregator) = setup();
    store.write_status(&door("main"), fields(json!({"door": "locked", "space": "open"})));

    let snapshot = aggregator.door_snapshot();
    assert_eq!(snapshot["main"], "unlocked");
    assert!(aggregator.space_state().open);
}

#[test]
fn test_space_state_only_tracks_main_door() {
    let (store, aggregator) = setup();
    store.write_status(&door("side"), fields(json!({"door": "locked", "space": "open"})));

    let snapshot = aggregator.door_snapshot();
    assert_eq!(snapshot["side"], "unlocked");
    assert!(!aggregator.space_state().open);
}

#[test]
fn test_space_api_lastchange_stable_without_flip() {
    let (store, aggregator) = setup();
    let initial = aggregator.space_api_snapshot().state;
    assert!(!initial.open);

    store.write_status(&door("main"), fields(json!({"door": "locked", "space": "closed"})));
    assert_eq!(aggregator.space_api_snapshot().state, initial);
    assert_eq!(aggregator.space_api_snapshot().state, initial);

    store.write_status(&door("main"), fields(json!({"door": "unlocked", "space": "open"})));
    let opened = aggregator.space_api_snapshot().state;
    assert!(opened.open);
    assert!(opened.lastchange >= initial.lastchange);

    // Re-reading unchanged input keeps the same change time
    store.write_status(&door("main"), fields(json!({"door": "unlocked", "space": "open"})));
    assert_eq!(aggregator.space_api_snapshot().state, opened);
    assert_eq!(aggregator.door_snapshot()["main"], "unlocked");
    assert_eq!(aggregator.space_api_snapshot().state, opened);
}

#[test]
fn test_space_api_document_shape() {
    let liveness = Arc::new(LivenessTracker::in_memory());
    let store = Arc::new(StatusStore::in_memory(liveness.clone()));
    let config = SpaceConfig {
        name: "Test Space".to_string(),
        url: "https://example.org".to_string(),
        email: "board@example.org".to_string(),
        lat: 55.5,
        lon: 12.25,
        ..SpaceConfig::default()
    };
    let aggregator = Aggregator::new(store, liveness, config);

    let doc = serde_json::to_value(aggregator.space_api_snapshot()).unwrap();
    assert_eq!(doc["api_compatibility"], json!(["14"]));
    assert_eq!(doc["space"], "Test Space");
    assert_eq!(doc["url"], "https://example.org");
    assert_eq!(doc["contact"]["email"], "board@example.org");
    assert_eq!(doc["location"]["lat"], 55.5);
    assert_eq!(doc["state"]["open"], false);
    assert!(doc["state"]["lastchange"].is_i64());
}

#[test]
fn test_space_tracker_edges() {
    let tracker = SpaceTracker::new(100);
    assert_eq!(tracker.current(), SpaceOpenState { open: false, lastchange: 100 });

    // Same value: no change
    assert_eq!(tracker.observe(false, 200).lastchange, 100);

    // Flip to open
    assert_eq!(tracker.observe(true, 300), SpaceOpenState { open: true, lastchange: 300 });
    assert_eq!(tracker.observe(true, 400).lastchange, 300);

    // Flip back
    assert_eq!(tracker.observe(false, 500), SpaceOpenState { open: false, lastchange: 500 });
    assert_eq!(tracker.current().lastchange, 500);
}

#[test]
fn test_main_door_without_space_field_keeps_state() {
    let (store, aggregator) = setup();
    store.write_status(&door("main"), fields(json!({"space": "open"})));
    let opened = aggregator.space_api_snapshot().state;
    assert!(opened.open);

    store.write_status(&door("main"), fields(json!({"door": "locked"})));
    assert_eq!(aggregator.space_api_snapshot().state, opened);
}
