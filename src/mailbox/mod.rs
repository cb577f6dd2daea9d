// Single-slot pending-action mailbox per addressable target

use crate::device::{Action, DeviceClass, DeviceKey};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use tracing::info;


/// Mailbox target
///
/// Door controllers get a slot each, cameras a slot per instance, and the
/// camera power unit a single slot for the whole class. Actions that other
/// devices request for a class wait in a separate `Requested` slot, drained
/// only once the class slot is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Device(String),
    Instance { class: DeviceClass, index: u32 },
    Class(DeviceClass),
    Requested(DeviceClass),
}

impl Address {
    /// Mailbox address a device drains when it polls
    pub fn for_device(key: &DeviceKey) -> Self {
        match key {
            DeviceKey::Door(name) => Address::Device(name.clone()),
            DeviceKey::Camera(index) => Address::Instance {
                class: DeviceClass::Camera,
                index: *index,
            },
            DeviceKey::CameraPower => Address::Class(DeviceClass::CameraPower),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Device(name) => write!(f, "device:{}", name),
            Address::Instance { class, index } => write!(f, "{}:{}", class, index),
            Address::Class(class) => write!(f, "class:{}", class),
            Address::Requested(class) => write!(f, "requested:{}", class),
        }
    }
}

/// Action waiting for its target to poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAction {
    pub action: Action,
    pub arg: Option<String>,
    pub queued_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(action: Action, arg: Option<String>) -> Self {
        Self {
            action,
            arg,
            queued_at: Utc::now(),
        }
    }
}

/// At most one pending action per address, last writer wins.
///
/// Not a queue: an action overwritten before its target polls is lost.
/// Slots are held in memory only.
pub struct Mailbox {
    slots: DashMap<Address, PendingAction>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Set the slot for `address`, discarding any unconsumed action.
    ///
    /// Returns the action that was overwritten, if any.
    pub fn enqueue(&self, address: Address, pending: PendingAction) -> Option<PendingAction> {
        info!(
            address = %address,
            action = %pending.action,
            arg = ?pending.arg,
            "Action queued"
        );
        let replaced = self.slots.insert(address.clone(), pending);
        if let Some(old) = &replaced {
            info!(address = %address, action = %old.action, "Unconsumed action overwritten");
        }
        replaced
    }

    /// Read and clear the slot for `address`.
    ///
    /// Removal is atomic: of two concurrent takes at most one sees the action.
    pub fn take(&self, address: &Address) -> Option<PendingAction> {
        let taken = self.slots.remove(address).map(|(_, pending)| pending);
        if let Some(pending) = &taken {
            info!(address = %address, action = %pending.action, "Action drained");
        }
        taken
    }

    /// Look at the slot without draining it
    #[cfg(test)]
    pub fn peek(&self, address: &Address) -> Option<PendingAction> {
        self.slots.get(address).map(|p| p.clone())
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
