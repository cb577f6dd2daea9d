pub mod secrets;
pub use secrets::{AccessList, Secrets};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete relay configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcsgwConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub camera: CameraDefaults,
    #[serde(default)]
    pub space: SpaceConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Where status records, heartbeat markers and device logs live
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_status_dir")]
    pub status_dir: PathBuf,
    #[serde(default = "default_heartbeat_dir")]
    pub heartbeat_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_status_dir() -> PathBuf {
    PathBuf::from("persistent")
}

fn default_heartbeat_dir() -> PathBuf {
    PathBuf::from("monitoring")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("persistent/logs")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            status_dir: default_status_dir(),
            heartbeat_dir: default_heartbeat_dir(),
            log_dir: default_log_dir(),
        }
    }
}

/// Settings handed to every camera on each poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDefaults {
    /// Seconds between camera polls
    #[serde(default = "default_keepalive")]
    pub keepalive: u64,
    /// Per-pixel difference that counts as changed
    #[serde(default = "default_pixel_threshold")]
    pub pixel_threshold: u64,
    /// Percentage of changed pixels that counts as motion
    #[serde(default = "default_percent_threshold")]
    pub percent_threshold: u64,
}

fn default_keepalive() -> u64 {
    60
}

fn default_pixel_threshold() -> u64 {
    25
}

fn default_percent_threshold() -> u64 {
    10
}

impl Default for CameraDefaults {
    fn default() -> Self {
        Self {
            keepalive: default_keepalive(),
            pixel_threshold: default_pixel_threshold(),
            percent_threshold: default_percent_threshold(),
        }
    }
}

impl CameraDefaults {
    /// Override from `CAMERA_DEFAULT_*` env vars; unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(n) = env_u64("CAMERA_DEFAULT_KEEPALIVE") {
            self.keepalive = n;
        }
        if let Some(n) = env_u64("CAMERA_DEFAULT_PIXEL_THRESHOLD") {
            self.pixel_threshold = n;
        }
        if let Some(n) = env_u64("CAMERA_DEFAULT_PERCENT_THRESHOLD") {
            self.percent_threshold = n;
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Static SpaceAPI metadata plus the door that decides open/closed
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceConfig {
    #[serde(default = "default_space_name")]
    pub name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub email: String,
    /// Door controller whose `space` field drives the open state
    #[serde(default = "default_main_door")]
    pub main_door: String,
}

fn default_space_name() -> String {
    "Makerspace".to_string()
}

fn default_main_door() -> String {
    "main".to_string()
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            name: default_space_name(),
            logo: String::new(),
            url: String::new(),
            address: String::new(),
            lat: 0.0,
            lon: 0.0,
            email: String::new(),
            main_door: default_main_door(),
        }
    }
}

/// Outbound chat notifications
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_enabled")]
    pub enabled: bool,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_icon_emoji")]
    pub icon_emoji: String,
    #[serde(default = "default_post_url")]
    pub post_url: String,
}

fn default_notify_enabled() -> bool {
    true
}

fn default_channel() -> String {
    "monitoring".to_string()
}

fn default_icon_emoji() -> String {
    ":panopticon:".to_string()
}

fn default_post_url() -> String {
    "https://slack.com/api/chat.postMessage".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_notify_enabled(),
            channel: default_channel(),
            icon_emoji: default_icon_emoji(),
            post_url: default_post_url(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<AcsgwConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: AcsgwConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load configuration from `path` if it exists, defaults otherwise.
///
/// Camera defaults are overridden from the environment either way.
pub fn load_config_or_default(path: &str) -> Result<AcsgwConfig, Box<dyn std::error::Error>> {
    let mut config = if Path::new(path).exists() {
        load_config(path)?
    } else {
        AcsgwConfig::default()
    };
    config.camera.apply_env();
    Ok(config)
}
