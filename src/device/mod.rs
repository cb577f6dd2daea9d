use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;


/// Maximum length of a door controller name
const MAX_DOOR_NAME_LEN: usize = 64;

/// Door names whose heartbeat marker would collide with a class marker
const RESERVED_DOOR_NAMES: &[&str] = &["cam", "camctl"];

/// Kind of device the relay talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Door controller (access control system)
    Door,
    /// Camera instance, addressed by index
    Camera,
    /// Camera power unit (singleton)
    CameraPower,
}

impl DeviceClass {
    /// Actions a device of this class knows how to perform
    pub fn allowed_actions(&self) -> &'static [Action] {
        match self {
            DeviceClass::Door => &[Action::Lock, Action::Unlock, Action::Reboot, Action::SetDesc],
            DeviceClass::Camera => &[Action::On, Action::Off, Action::Continuous, Action::Motion],
            DeviceClass::CameraPower => &[Action::On, Action::Off, Action::Reboot],
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.allowed_actions().contains(&action)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Door => write!(f, "door"),
            DeviceClass::Camera => write!(f, "camera"),
            DeviceClass::CameraPower => write!(f, "camctl"),
        }
    }
}

/// Identity of a device whose status the relay stores
///
/// Door controllers carry a free-form name, cameras a numeric index, and the
/// camera power unit is a singleton.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceKey {
    Door(String),
    Camera(u32),
    CameraPower,
}

impl DeviceKey {
    /// Build a door key, validating the name.
    ///
    /// Names become file names, so only `[A-Za-z0-9_-]` is accepted. `cam`
    /// and `camctl` are reserved for the camera heartbeat markers.
    pub fn door(name: &str) -> Result<Self, DeviceError> {
        validate_door_name(name)?;
        Ok(DeviceKey::Door(name.to_string()))
    }

    /// Parse a camera instance from its decimal representation
    pub fn camera(instance: &str) -> Result<Self, DeviceError> {
        if instance.is_empty() || !instance.chars().all(|c| c.is_ascii_digit()) {
            return Err(DeviceError::InvalidInstance(instance.to_string()));
        }
        instance
            .parse::<u32>()
            .map(DeviceKey::Camera)
            .map_err(|_| DeviceError::InvalidInstance(instance.to_string()))
    }

    pub fn class(&self) -> DeviceClass {
        match self {
            DeviceKey::Door(_) => DeviceClass::Door,
            DeviceKey::Camera(_) => DeviceClass::Camera,
            DeviceKey::CameraPower => DeviceClass::CameraPower,
        }
    }

    /// Location of the persisted status record below `root`
    pub fn status_path(&self, root: &Path) -> PathBuf {
        match self {
            DeviceKey::Door(name) => root.join("doors").join(format!("{}.json", name)),
            DeviceKey::Camera(index) => root.join("cams").join(format!("{}.json", index)),
            DeviceKey::CameraPower => root.join("camctl.json"),
        }
    }

    /// File name of the heartbeat marker watched by external monitoring.
    ///
    /// Cameras share one marker for the whole class.
    pub fn heartbeat_marker(&self) -> String {
        match self {
            DeviceKey::Door(name) => format!("{}-heartbeat", name),
            DeviceKey::Camera(_) => "cam-heartbeat".to_string(),
            DeviceKey::CameraPower => "camctl-heartbeat".to_string(),
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKey::Door(name) => write!(f, "door:{}", name),
            DeviceKey::Camera(index) => write!(f, "camera:{}", index),
            DeviceKey::CameraPower => write!(f, "camctl"),
        }
    }
}

/// Action a device can be asked to perform on its next poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Lock,
    Unlock,
    Reboot,
    SetDesc,
    On,
    Off,
    Continuous,
    Motion,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Lock => "lock",
            Action::Unlock => "unlock",
            Action::Reboot => "reboot",
            Action::SetDesc => "setdesc",
            Action::On => "on",
            Action::Off => "off",
            Action::Continuous => "continuous",
            Action::Motion => "motion",
        }
    }

    /// Whether the action carries a free-text argument
    pub fn takes_argument(&self) -> bool {
        matches!(self, Action::SetDesc)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lock" => Ok(Action::Lock),
            "unlock" => Ok(Action::Unlock),
            "reboot" => Ok(Action::Reboot),
            "setdesc" => Ok(Action::SetDesc),
            "on" => Ok(Action::On),
            "off" => Ok(Action::Off),
            "continuous" => Ok(Action::Continuous),
            "motion" => Ok(Action::Motion),
            other => Err(DeviceError::UnknownAction(other.to_string())),
        }
    }
}

/// Parse `token` as an action and check it against `class`
pub fn parse_action_for(class: DeviceClass, token: &str) -> Result<Action, DeviceError> {
    let action: Action = token.parse()?;
    if !class.allows(action) {
        return Err(DeviceError::UnsupportedAction { class, action });
    }
    Ok(action)
}

/// Device addressing errors
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Door name empty, too long or containing forbidden characters
    InvalidName(String),
    /// Camera instance is not a non-negative integer
    InvalidInstance(String),
    /// Token is not any known action
    UnknownAction(String),
    /// Action exists but the device class does not support it
    UnsupportedAction { class: DeviceClass, action: Action },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::InvalidName(name) => write!(f, "invalid device name '{}'", name),
            DeviceError::InvalidInstance(instance) => {
                write!(f, "invalid camera instance '{}'", instance)
            }
            DeviceError::UnknownAction(token) => write!(f, "unknown action '{}'", token),
            DeviceError::UnsupportedAction { class, action } => {
                write!(f, "action '{}' not supported by {}", action, class)
            }
        }
    }
}

impl std::error::Error for DeviceError {}

fn validate_door_name(name: &str) -> Result<(), DeviceError> {
    if name.is_empty() || name.len() > MAX_DOOR_NAME_LEN {
        return Err(DeviceError::InvalidName(name.to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DeviceError::InvalidName(name.to_string()));
    }
    if RESERVED_DOOR_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
    {
        return Err(DeviceError::InvalidName(name.to_string()));
    }
    Ok(())
}
