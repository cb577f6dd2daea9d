// Append-only log files fed by device log uploads

use crate::device::DeviceKey;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Writes device log lines into hourly files per device
pub struct DeviceLog {
    dir: PathBuf,
    /// Serializes appends so lines from concurrent uploads never interleave
    write_lock: Mutex<()>,
}

impl DeviceLog {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Append `"<stamp> <text>"` to the device's file for the current hour
    pub fn append(&self, device: &DeviceKey, stamp: &str, text: &str) -> Result<PathBuf> {
        self.append_at(device, stamp, text, Local::now())
    }

    pub fn append_at(
        &self,
        device: &DeviceKey,
        stamp: &str,
        text: &str,
        now: DateTime<Local>,
    ) -> Result<PathBuf> {
        let path = log_path(&self.dir, device, now);
        let _guard = self.write_lock.lock().expect("DeviceLog lock poisoned");

        fs::create_dir_all(&self.dir).context("Failed to create log directory")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        writeln!(file, "{} {}", stamp, text).context("Failed to append log line")?;

        debug!(device = %device, path = %path.display(), "Device log line stored");
        Ok(path)
    }
}

fn log_path(dir: &Path, device: &DeviceKey, now: DateTime<Local>) -> PathBuf {
    let prefix = match device {
        DeviceKey::Door(name) => name.clone(),
        DeviceKey::Camera(index) => format!("cam{}", index),
        DeviceKey::CameraPower => "camctl".to_string(),
    };
    dir.join(format!("{}-{}.log", prefix, now.format("%Y-%m-%d-%H")))
}
