// Chat command dispatch

use crate::config::AccessList;
use crate::device::{parse_action_for, Action, DeviceClass, DeviceKey};
use crate::mailbox::{Address, PendingAction};
use crate::relay::Relay;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;


/// Body of an unknown-command reply (sent with a success status)
pub const UNKNOWN_COMMAND: &str = "Unknown command";

const NOT_ALLOWED_ACS: &str = "You are not allowed to perform ACS actions";
const NOT_ALLOWED_CAMERA: &str = "You are not allowed to perform camera actions";
const ACS_USAGE: &str =
    "Usage: action <device> <lock|unlock|reboot|setdesc> [argument] or action <open|close>";

/// Reply posted back into the channel the command came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response_type: &'static str,
    pub text: String,
}

impl ChatReply {
    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            response_type: "in_channel",
            text: text.into(),
        }
    }
}

/// Result of dispatching a chat command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Reply(ChatReply),
    Unknown,
}

impl CommandOutcome {
    /// Reply text, or the unknown-command body
    pub fn text(&self) -> &str {
        match self {
            CommandOutcome::Reply(reply) => &reply.text,
            CommandOutcome::Unknown => UNKNOWN_COMMAND,
        }
    }
}

/// Maps validated chat commands onto the relay.
///
/// Rejections (missing permission, bad arity, unsupported action) come back
/// as ordinary replies, never as errors.
pub struct CommandRouter {
    relay: Arc<Relay>,
    acs_users: AccessList,
    cam_users: AccessList,
}

impl CommandRouter {
    pub fn new(relay: Arc<Relay>, acs_users: AccessList, cam_users: AccessList) -> Self {
        Self {
            relay,
            acs_users,
            cam_users,
        }
    }

    /// Dispatch `command` with its free-text `args` on behalf of `caller`
    pub fn dispatch(&self, command: &str, args: &str, caller: &str) -> CommandOutcome {
        info!(command = %command, caller = %caller, "Chat command received");

        let text = match command {
            "status" | "acsstatus" => self.relay.aggregator.operator_summary(),
            "camstatus" => self.relay.aggregator.camera_summary(),
            "action" | "acsaction" => self.door_action(args, caller),
            "camaction" => self.camera_action(args, caller),
            "camctl" => self.camera_power_action(args, caller),
            _ => return CommandOutcome::Unknown,
        };
        CommandOutcome::Reply(ChatReply::in_channel(text))
    }

    /// `action <device> <action> [arg...]` or `action <open|close>`
    fn door_action(&self, args: &str, caller: &str) -> String {
        if !self.acs_users.allows(caller) {
            info!(caller = %caller, "ACS action refused");
            return NOT_ALLOWED_ACS.to_string();
        }

        let tokens: Vec<&str> = args.split_whitespace().collect();
        match tokens.as_slice() {
            [] => ACS_USAGE.to_string(),
            ["open"] => self.set_open_policy(true),
            ["close"] => self.set_open_policy(false),
            [_] => format!("Invalid parameters for ACS action\n{}", ACS_USAGE),
            [device, action, rest @ ..] => {
                let door = match DeviceKey::door(device) {
                    Ok(door) => door,
                    Err(_) => return format!("Invalid device name '{}'", device),
                };
                let action = match parse_action_for(DeviceClass::Door, action) {
                    Ok(action) => action,
                    Err(_) => return format!("ACS action '{}' not supported", action),
                };
                let arg = (!rest.is_empty()).then(|| skip_tokens(args, 2).to_string());
                self.queue_door_action(&door, device, action, arg)
            }
        }
    }

    fn queue_door_action(
        &self,
        door: &DeviceKey,
        device: &str,
        action: Action,
        arg: Option<String>,
    ) -> String {
        match (action.takes_argument(), &arg) {
            (true, None) => return format!("ACS action '{}' requires an argument", action),
            (false, Some(_)) => return format!("ACS action '{}' takes no argument", action),
            _ => {}
        }

        self.relay
            .mailbox
            .enqueue(Address::for_device(door), PendingAction::new(action, arg));
        format!("ACS action '{}' queued for {}", action, device)
    }

    fn set_open_policy(&self, allow: bool) -> String {
        self.relay.policy.set_allow_open(allow);
        if allow {
            "Opening is now allowed".to_string()
        } else {
            "Opening is no longer allowed".to_string()
        }
    }

    /// `camaction <instance> <on|off|continuous|motion>`
    fn camera_action(&self, args: &str, caller: &str) -> String {
        if !self.cam_users.allows(caller) {
            info!(caller = %caller, "Camera action refused");
            return NOT_ALLOWED_CAMERA.to_string();
        }

        let tokens: Vec<&str> = args.split_whitespace().collect();
        let [instance, action] = tokens.as_slice() else {
            return "Invalid parameters for camera action".to_string();
        };

        let index = match DeviceKey::camera(instance) {
            Ok(DeviceKey::Camera(index)) => index,
            _ => return format!("Invalid camera instance '{}'", instance),
        };
        let action = match parse_action_for(DeviceClass::Camera, action) {
            Ok(action) => action,
            Err(_) => return format!("Camera action '{}' not supported", action),
        };

        self.relay.mailbox.enqueue(
            Address::Instance {
                class: DeviceClass::Camera,
                index,
            },
            PendingAction::new(action, None),
        );
        format!("Camera action '{}' queued for instance {}", action, index)
    }

    /// `camctl <on|off|reboot>`
    fn camera_power_action(&self, args: &str, caller: &str) -> String {
        if !self.cam_users.allows(caller) {
            info!(caller = %caller, "Camctl action refused");
            return NOT_ALLOWED_CAMERA.to_string();
        }

        let tokens: Vec<&str> = args.split_whitespace().collect();
        let [action] = tokens.as_slice() else {
            return "Invalid parameters for camctl".to_string();
        };

        let action = match parse_action_for(DeviceClass::CameraPower, action) {
            Ok(action) => action,
            Err(_) => return format!("Camctl action '{}' not supported", action),
        };

        self.relay.mailbox.enqueue(
            Address::Class(DeviceClass::CameraPower),
            PendingAction::new(action, None),
        );
        format!("Camctl action '{}' queued", action)
    }
}

/// Text after the first `n` whitespace-separated tokens, with inner spacing
/// kept as typed
fn skip_tokens(text: &str, n: usize) -> &str {
    let mut rest = text.trim();
    for _ in 0..n {
        rest = match rest.find(char::is_whitespace) {
            Some(end) => rest[end..].trim_start(),
            None => "",
        };
    }
    rest
}
