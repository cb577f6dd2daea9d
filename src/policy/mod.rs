use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Process-lifetime toggles not tied to any one device.
///
/// Not persisted: every flag starts at its default on restart.
pub struct PolicyFlags {
    /// Whether door controllers may honour "open" requests
    allow_open: AtomicBool,
}

impl PolicyFlags {
    pub fn new() -> Self {
        Self {
            allow_open: AtomicBool::new(false),
        }
    }

    pub fn allow_open(&self) -> bool {
        self.allow_open.load(Ordering::SeqCst)
    }

    /// Set `allow_open`, returning the previous value
    pub fn set_allow_open(&self, allow: bool) -> bool {
        let previous = self.allow_open.swap(allow, Ordering::SeqCst);
        if previous != allow {
            info!(allow_open = allow, "Open policy changed");
        }
        previous
    }
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self::new()
    }
}
