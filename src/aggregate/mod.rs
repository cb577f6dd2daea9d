// Read-only views over stored status

mod format;
mod space;

pub use format::{capitalize, display_value, humanize_key};
pub use space::{SpaceApi, SpaceContact, SpaceLocation, SpaceOpenState, SpaceTracker};

use crate::config::SpaceConfig;
use crate::device::DeviceKey;
use crate::status::{format_stamp, LivenessTracker, StatusRecord, StatusStore};
use chrono::{Local, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// Reply used when there is nothing to summarize
pub const NO_STATUS: &str = "No status";

/// Field reporting the physical door state
pub const DOOR_FIELD: &str = "door";

/// Field reporting whether the space is open (main door only)
pub const SPACE_FIELD: &str = "space";

/// Builds operator and public views from the status store.
///
/// The only state it mutates is the space open tracker.
pub struct Aggregator {
    store: Arc<StatusStore>,
    liveness: Arc<LivenessTracker>,
    space: SpaceTracker,
    space_config: SpaceConfig,
}

impl Aggregator {
    pub fn new(
        store: Arc<StatusStore>,
        liveness: Arc<LivenessTracker>,
        space_config: SpaceConfig,
    ) -> Self {
        Self {
            store,
            liveness,
            space: SpaceTracker::new(Utc::now().timestamp()),
            space_config,
        }
    }

    /// One block per door controller listing every stored field
    pub fn operator_summary(&self) -> String {
        let blocks: Vec<String> = self
            .store
            .read_all()
            .into_iter()
            .filter_map(|(key, record)| match &key {
                DeviceKey::Door(name) => Some(self.door_block(&key, name, &record)),
                _ => None,
            })
            .collect();

        if blocks.is_empty() {
            return NO_STATUS.to_string();
        }
        blocks.join("\n\n")
    }

    fn door_block(&self, key: &DeviceKey, name: &str, record: &StatusRecord) -> String {
        let mut lines = vec![format!("*{}*", capitalize(name))];
        for (field, value) in record.to_json() {
            lines.push(format!("{}: {}", humanize_key(&field), display_value(&value)));
        }
        if let Some(seen) = self.liveness.last_seen(key) {
            lines.push(format!("Last seen: {}", format_stamp(&seen.with_timezone(&Local))));
        }
        lines.join("\n")
    }

    /// One line per camera, ordered by instance, then the power unit
    pub fn camera_summary(&self) -> String {
        let lines: Vec<String> = self
            .store
            .read_all()
            .into_iter()
            .filter_map(|(key, record)| match key {
                DeviceKey::Camera(index) => Some(camera_line(&index.to_string(), &record)),
                DeviceKey::CameraPower => Some(camera_line("Power", &record)),
                DeviceKey::Door(_) => None,
            })
            .collect();

        if lines.is_empty() {
            return NO_STATUS.to_string();
        }
        lines.join("\n")
    }

    /// Effective door state per door controller.
    ///
    /// A `space` of `open` reports the door as `unlocked` whatever the `door`
    /// field says. Also refreshes the space open state from the main door.
    pub fn door_snapshot(&self) -> BTreeMap<String, String> {
        let records = self.store.read_all();
        self.refresh_space_state(&records);

        records
            .iter()
            .filter_map(|(key, record)| {
                let DeviceKey::Door(name) = key else {
                    return None;
                };
                let door = record.fields.get(DOOR_FIELD)?;
                let state = if record.field_str(SPACE_FIELD) == Some("open") {
                    "unlocked".to_string()
                } else {
                    display_value(door)
                };
                Some((name.clone(), state))
            })
            .collect()
    }

    /// Public space-state document with the live open state
    pub fn space_api_snapshot(&self) -> SpaceApi {
        let main = self.main_door_key();
        let state = match self.store.read_status(&main) {
            Some(record) => self.observe_main_door(&record),
            None => self.space.current(),
        };
        SpaceApi::new(&self.space_config, state)
    }

    pub fn space_state(&self) -> SpaceOpenState {
        self.space.current()
    }

    fn main_door_key(&self) -> DeviceKey {
        DeviceKey::Door(self.space_config.main_door.clone())
    }

    fn refresh_space_state(&self, records: &BTreeMap<DeviceKey, StatusRecord>) {
        if let Some(record) = records.get(&self.main_door_key()) {
            self.observe_main_door(record);
        }
    }

    /// Records without a `space` field leave the state untouched
    fn observe_main_door(&self, record: &StatusRecord) -> SpaceOpenState {
        match record.field_str(SPACE_FIELD) {
            Some(space) => self.space.observe(space == "open", Utc::now().timestamp()),
            None => self.space.current(),
        }
    }
}

fn camera_line(label: &str, record: &StatusRecord) -> String {
    let parts: Vec<String> = record
        .to_json()
        .iter()
        .map(|(field, value)| {
            if format::is_active_field(field) {
                format::active_label(value).to_string()
            } else {
                format!(
                    "{}: {}",
                    format::abbreviate_camera_field(field),
                    display_value(value)
                )
            }
        })
        .collect();
    format!("{}: {}", label, parts.join(", "))
}
