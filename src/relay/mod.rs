// Process-wide relay state and device-facing operations

use crate::aggregate::Aggregator;
use crate::config::{AcsgwConfig, CameraDefaults, SpaceConfig};
use crate::device::{Action, DeviceClass, DeviceError, DeviceKey};
use crate::mailbox::{Address, Mailbox, PendingAction};
use crate::notify::Notifier;
use crate::policy::PolicyFlags;
use crate::status::{LivenessTracker, StatusRecord, StatusStore};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};


/// Reply to a door controller poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoorPoll {
    pub action: Option<Action>,
    pub arg: Option<String>,
    pub allow_open: bool,
}

/// Reply to a camera poll: the drained action plus camera defaults
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraPoll {
    #[serde(flatten)]
    pub defaults: CameraDefaults,
    pub action: Option<Action>,
    pub arg: Option<String>,
}

/// Reply to a camera power unit poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraPowerPoll {
    pub action: Option<Action>,
    pub arg: Option<String>,
}

/// Live fields a camera reports on each poll (query parameters)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraReport {
    pub active: Option<String>,
    pub continuous: Option<String>,
    pub last_pic: Option<String>,
    pub version: Option<String>,
}

impl CameraReport {
    /// Stored field names for the reported values; empty values are skipped
    fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("active", &self.active),
            ("continuous mode", &self.continuous),
            ("last picture", &self.last_pic),
            ("version", &self.version),
        ]
        .into_iter()
        .filter_map(|(name, value)| match value.as_deref() {
            Some(v) if !v.is_empty() => Some((name, v)),
            _ => None,
        })
        .collect()
    }
}

/// Everything the relay shares between request handlers.
///
/// Created once at startup and handed to every router behind an `Arc`.
/// Mailbox slots, policy flags and liveness are memory only; status
/// records are persisted by the store.
pub struct Relay {
    pub status: Arc<StatusStore>,
    pub liveness: Arc<LivenessTracker>,
    pub mailbox: Mailbox,
    pub policy: PolicyFlags,
    pub aggregator: Aggregator,
    camera_defaults: CameraDefaults,
    main_door: String,
    notifier: Arc<dyn Notifier>,
    /// Last `active` value reported by the camera power unit
    last_power_state: Mutex<Option<String>>,
}

impl Relay {
    pub fn new(
        status: Arc<StatusStore>,
        liveness: Arc<LivenessTracker>,
        camera_defaults: CameraDefaults,
        space: SpaceConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let main_door = space.main_door.clone();
        Self {
            aggregator: Aggregator::new(status.clone(), liveness.clone(), space),
            status,
            liveness,
            mailbox: Mailbox::new(),
            policy: PolicyFlags::new(),
            camera_defaults,
            main_door,
            notifier,
            last_power_state: Mutex::new(None),
        }
    }

    /// Relay with no persistence and default settings
    pub fn in_memory(notifier: Arc<dyn Notifier>) -> Self {
        let liveness = Arc::new(LivenessTracker::in_memory());
        let status = Arc::new(StatusStore::in_memory(liveness.clone()));
        Self::new(
            status,
            liveness,
            CameraDefaults::default(),
            SpaceConfig::default(),
            notifier,
        )
    }

    /// Build the relay from configuration: load persisted status and create
    /// missing heartbeat markers.
    pub fn from_config(config: &AcsgwConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let main = DeviceKey::door(&config.space.main_door)
            .context("Configured main door has an invalid name")?;

        let liveness = Arc::new(LivenessTracker::new(Some(config.storage.heartbeat_dir.clone())));
        liveness.init_markers(&[main, DeviceKey::Camera(0), DeviceKey::CameraPower]);

        let status = Arc::new(StatusStore::new(
            Some(config.storage.status_dir.clone()),
            liveness.clone(),
        ));
        status.load().context("Failed to load status records")?;

        Ok(Self::new(
            status,
            liveness,
            config.camera,
            config.space.clone(),
            notifier,
        ))
    }

    pub fn main_door(&self) -> &str {
        &self.main_door
    }

    pub fn camera_defaults(&self) -> CameraDefaults {
        self.camera_defaults
    }

    /// Door a request addresses; requests without a name mean the main door
    pub fn resolve_door(&self, device: Option<&str>) -> Result<DeviceKey, DeviceError> {
        DeviceKey::door(device.unwrap_or(&self.main_door))
    }

    /// Door controller poll.
    ///
    /// Drains only this door's slot; a door with nothing pending (including
    /// one never seen before) gets no action but still learns the current
    /// open policy. Optional `status` is stored before draining.
    pub fn poll_door(&self, door: &DeviceKey, status: Option<Map<String, Value>>) -> DoorPoll {
        match status {
            Some(fields) => {
                self.status.write_status(door, fields);
            }
            None => self.liveness.touch(door),
        }

        let pending = self.mailbox.take(&Address::for_device(door));
        let allow_open = self.policy.allow_open();
        debug!(device = %door, action = ?pending.as_ref().map(|p| p.action), allow_open, "Door poll");

        let (action, arg) = split(pending);
        DoorPoll {
            action,
            arg,
            allow_open,
        }
    }

    pub fn push_door_status(&self, door: &DeviceKey, fields: Map<String, Value>) -> StatusRecord {
        info!(device = %door, fields = fields.len(), "Door status pushed");
        self.status.write_status(door, fields)
    }

    /// Heartbeat without status: re-stamp the existing record
    pub fn door_heartbeat(&self, door: &DeviceKey) -> StatusRecord {
        debug!(device = %door, "Door heartbeat");
        self.status.touch(door)
    }

    /// Camera power request from a door controller.
    ///
    /// Door requests have their own slot: a newer request replaces an older
    /// one, and an operator action pending for the power unit is delivered
    /// first. Returns the earlier door request this one replaced.
    pub fn request_camera_power(&self, action: Action) -> Result<Option<Action>, DeviceError> {
        if !DeviceClass::CameraPower.allows(action) {
            return Err(DeviceError::UnsupportedAction {
                class: DeviceClass::CameraPower,
                action,
            });
        }
        let replaced = self.mailbox.enqueue(
            Address::Requested(DeviceClass::CameraPower),
            PendingAction::new(action, None),
        );
        Ok(replaced.map(|p| p.action))
    }

    /// Camera poll: merge reported fields into the stored record, drain the
    /// camera's slot and hand out the camera defaults.
    pub fn poll_camera(&self, index: u32, report: &CameraReport) -> CameraPoll {
        let key = DeviceKey::Camera(index);
        self.status.update_status(&key, |current| {
            let mut fields = current.map(|r| r.fields.clone()).unwrap_or_default();
            for (name, value) in report.fields() {
                fields.insert(name.to_string(), Value::String(value.to_string()));
            }
            fields
        });

        let (action, arg) = split(self.mailbox.take(&Address::for_device(&key)));
        debug!(camera = index, action = ?action, "Camera poll");

        CameraPoll {
            defaults: self.camera_defaults,
            action,
            arg,
        }
    }

    /// Camera power unit poll; notifies the chat channel when the reported
    /// power state changes. Operator actions drain before door requests.
    pub fn poll_camera_power(&self, active: Option<&str>) -> CameraPowerPoll {
        let key = DeviceKey::CameraPower;
        let active = active.filter(|a| !a.is_empty());

        self.status.update_status(&key, |current| {
            let mut fields = current.map(|r| r.fields.clone()).unwrap_or_default();
            if let Some(active) = active {
                fields.insert("active".to_string(), Value::String(active.to_string()));
            }
            fields
        });

        if let Some(active) = active {
            self.note_power_state(active);
        }

        let pending = self
            .mailbox
            .take(&Address::for_device(&key))
            .or_else(|| self.mailbox.take(&Address::Requested(DeviceClass::CameraPower)));
        let (action, arg) = split(pending);
        debug!(action = ?action, "Camera power poll");
        CameraPowerPoll { action, arg }
    }

    fn note_power_state(&self, active: &str) {
        let changed = {
            let mut last = self
                .last_power_state
                .lock()
                .expect("power state lock poisoned");
            if last.as_deref() == Some(active) {
                false
            } else {
                *last = Some(active.to_string());
                true
            }
        };

        if changed {
            let state = if active == "1" { "on" } else { "off" };
            info!(active = %active, "Camera power state changed");
            self.notifier
                .notify(&format!(":camera: Cameras are {}", state));
        }
    }
}

fn split(pending: Option<PendingAction>) -> (Option<Action>, Option<String>) {
    match pending {
        Some(p) => (Some(p.action), p.arg),
        None => (None, None),
    }
}
