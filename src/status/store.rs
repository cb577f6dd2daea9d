use crate::device::DeviceKey;
use crate::status::liveness::LivenessTracker;
use crate::status::record::StatusRecord;
use anyhow::{Context, Result};
use chrono::Local;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Last-known-value store for device status.
///
/// Records live in memory and, when a directory is configured, are mirrored
/// to one JSON file per device. All mutations of a device's record run under
/// that device's map entry lock, so concurrent writers for the same device
/// are serialized while different devices proceed independently. File I/O
/// happens after the entry lock is released.
pub struct StatusStore {
    records: DashMap<DeviceKey, StatusRecord>,

    /// Root of persisted records. None = memory only.
    dir: Option<PathBuf>,

    /// Per-device guard serializing file writes
    persist_locks: DashMap<DeviceKey, Arc<Mutex<()>>>,

    liveness: Arc<LivenessTracker>,
}

impl StatusStore {
    pub fn new(dir: Option<PathBuf>, liveness: Arc<LivenessTracker>) -> Self {
        Self {
            records: DashMap::new(),
            dir,
            persist_locks: DashMap::new(),
            liveness,
        }
    }

    pub fn in_memory(liveness: Arc<LivenessTracker>) -> Self {
        Self::new(None, liveness)
    }

    /// Load persisted records from disk.
    ///
    /// Unreadable or malformed files are logged and skipped. Returns the
    /// number of records loaded.
    pub fn load(&self) -> Result<usize> {
        let Some(dir) = &self.dir else {
            return Ok(0);
        };

        fs::create_dir_all(dir.join("doors")).context("Failed to create door status directory")?;
        fs::create_dir_all(dir.join("cams")).context("Failed to create camera status directory")?;

        let mut loaded = 0;
        for (key, path) in discover_records(dir)? {
            match read_record(&path) {
                Ok(record) => {
                    self.records.insert(key, record);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable status record");
                }
            }
        }

        info!(records = loaded, dir = %dir.display(), "Loaded status records");
        Ok(loaded)
    }

    /// Replace the record for `key` with `fields` plus a fresh `last update`.
    ///
    /// Also refreshes liveness for `key`.
    pub fn write_status(&self, key: &DeviceKey, fields: Map<String, Value>) -> StatusRecord {
        self.update_status(key, |_| fields)
    }

    /// Read-modify-write of one record, serialized against other writers
    /// for the same device. `build` receives the current record, if any, and
    /// returns the complete new field set.
    pub fn update_status<F>(&self, key: &DeviceKey, build: F) -> StatusRecord
    where
        F: FnOnce(Option<&StatusRecord>) -> Map<String, Value>,
    {
        let record = match self.records.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let record = StatusRecord::new(build(Some(occupied.get())), Local::now());
                occupied.insert(record.clone());
                record
            }
            Entry::Vacant(vacant) => {
                let record = StatusRecord::new(build(None), Local::now());
                vacant.insert(record.clone());
                record
            }
        };

        self.persist(key);
        self.liveness.touch(key);
        debug!(device = %key, fields = record.fields.len(), "Status stored");
        record
    }

    /// Re-stamp the record for `key` without changing its fields, creating
    /// an empty record if none exists.
    pub fn touch(&self, key: &DeviceKey) -> StatusRecord {
        self.update_status(key, |current| {
            current.map(|r| r.fields.clone()).unwrap_or_default()
        })
    }

    pub fn read_status(&self, key: &DeviceKey) -> Option<StatusRecord> {
        self.records.get(key).map(|r| r.clone())
    }

    /// Snapshot of every record, ordered by device key.
    ///
    /// Each record is internally consistent; there is no cross-device
    /// atomicity.
    pub fn read_all(&self) -> BTreeMap<DeviceKey, StatusRecord> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Write the current record for `key` to disk.
    ///
    /// The record is re-read under the device's persist lock, so the last
    /// writer to get the lock leaves the newest record on disk even when
    /// writers finish out of order.
    fn persist(&self, key: &DeviceKey) {
        let Some(dir) = &self.dir else {
            return;
        };
        let lock = self
            .persist_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().expect("persist lock poisoned");

        let Some(record) = self.read_status(key) else {
            return;
        };
        let path = key.status_path(dir);
        if let Err(e) = write_record(&path, &record) {
            error!(device = %key, path = %path.display(), error = %e, "Failed to persist status");
        }
    }
}

/// Atomic write: temp file, then rename over the final path
fn write_record(path: &Path, record: &StatusRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create status directory")?;
    }

    let json = serde_json::to_string(&record.to_json()).context("Failed to serialize status")?;
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path).context("Failed to create temporary status file")?;
        file.write_all(json.as_bytes())
            .context("Failed to write temporary status file")?;
        file.sync_all()
            .context("Failed to sync status file to disk")?;
    }
    fs::rename(&tmp_path, path).context("Failed to rename temporary status file")?;
    Ok(())
}

fn read_record(path: &Path) -> Result<StatusRecord> {
    let contents = fs::read_to_string(path).context("Failed to read status file")?;
    let fields: Map<String, Value> =
        serde_json::from_str(&contents).context("Failed to parse status JSON")?;
    StatusRecord::from_json(fields).context("Status record has no valid 'last update' stamp")
}

/// Map persisted files back to device keys
fn discover_records(dir: &Path) -> Result<Vec<(DeviceKey, PathBuf)>> {
    let mut found = Vec::new();

    for subdir in ["doors", "cams"] {
        let entries = fs::read_dir(dir.join(subdir))
            .with_context(|| format!("Failed to list {} status directory", subdir))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let parsed = if subdir == "doors" {
                DeviceKey::door(stem)
            } else {
                DeviceKey::camera(stem)
            };
            match parsed {
                Ok(key) => found.push((key, path)),
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unexpected status file"),
            }
        }
    }

    let camctl = DeviceKey::CameraPower.status_path(dir);
    if camctl.is_file() {
        found.push((DeviceKey::CameraPower, camctl));
    }

    Ok(found)
}
