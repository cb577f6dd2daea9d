use crate::device::DeviceKey;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

const MARKER_STARTING: &str = "OK\nStarting|a=0";
const MARKER_UPDATED: &str = "OK\nUpdated|a=0";

/// Tracks when each device last contacted the relay.
///
/// Purely informational: nothing expires here. External monitoring watches
/// the heartbeat marker files and raises alarms when they go stale.
pub struct LivenessTracker {
    last_seen: DashMap<DeviceKey, DateTime<Utc>>,

    /// Directory holding heartbeat marker files. None = no markers.
    marker_dir: Option<PathBuf>,
}

impl LivenessTracker {
    pub fn new(marker_dir: Option<PathBuf>) -> Self {
        Self {
            last_seen: DashMap::new(),
            marker_dir,
        }
    }

    /// Tracker without marker files (tests, dry runs)
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Record contact from `key` and refresh its heartbeat marker
    pub fn touch(&self, key: &DeviceKey) {
        self.last_seen.insert(key.clone(), Utc::now());
        self.write_marker(key, MARKER_UPDATED);
    }

    pub fn last_seen(&self, key: &DeviceKey) -> Option<DateTime<Utc>> {
        self.last_seen.get(key).map(|t| *t)
    }

    /// Create "starting" markers for `keys` that have none yet
    pub fn init_markers<'a>(&self, keys: impl IntoIterator<Item = &'a DeviceKey>) {
        let Some(dir) = &self.marker_dir else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir) {
            warn!(error = %e, dir = %dir.display(), "Failed to create heartbeat directory");
            return;
        }
        for key in keys {
            let path = dir.join(key.heartbeat_marker());
            if !path.exists() {
                self.write_marker(key, MARKER_STARTING);
            }
        }
    }

    fn write_marker(&self, key: &DeviceKey, content: &str) {
        let Some(dir) = &self.marker_dir else {
            return;
        };
        let path = dir.join(key.heartbeat_marker());
        match fs::write(&path, content) {
            Ok(()) => debug!(device = %key, path = %path.display(), "Heartbeat marker written"),
            Err(e) => warn!(
                device = %key,
                path = %path.display(),
                error = %e,
                "Failed to write heartbeat marker"
            ),
        }
    }
}
