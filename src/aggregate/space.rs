use crate::config::SpaceConfig;
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;

/// SpaceAPI schema version we emit
const SPACE_API_VERSION: &str = "14";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpacePhase {
    Closed,
    Open,
}

/// Derived open flag plus when it last flipped (UNIX seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpaceOpenState {
    pub open: bool,
    pub lastchange: i64,
}

/// Edge detector for the space open state.
///
/// Evaluated on every read of the main door's `space` field; `lastchange`
/// only moves when the phase flips. There is no timeout back to closed.
pub struct SpaceTracker {
    inner: Mutex<(SpacePhase, i64)>,
}

impl SpaceTracker {
    /// Start closed, with `now` as the initial change time
    pub fn new(now: i64) -> Self {
        Self {
            inner: Mutex::new((SpacePhase::Closed, now)),
        }
    }

    /// Feed the latest observed value; returns the resulting state
    pub fn observe(&self, open: bool, now: i64) -> SpaceOpenState {
        let next = if open {
            SpacePhase::Open
        } else {
            SpacePhase::Closed
        };

        let mut inner = self.inner.lock().expect("SpaceTracker lock poisoned");
        if inner.0 != next {
            info!(open = open, lastchange = now, "Space state changed");
            *inner = (next, now);
        }
        to_state(*inner)
    }

    pub fn current(&self) -> SpaceOpenState {
        to_state(*self.inner.lock().expect("SpaceTracker lock poisoned"))
    }
}

fn to_state((phase, lastchange): (SpacePhase, i64)) -> SpaceOpenState {
    SpaceOpenState {
        open: phase == SpacePhase::Open,
        lastchange,
    }
}

/// Public space-state document (SpaceAPI subset)
#[derive(Debug, Clone, Serialize)]
pub struct SpaceApi {
    pub api_compatibility: Vec<String>,
    pub space: String,
    pub logo: String,
    pub url: String,
    pub location: SpaceLocation,
    pub contact: SpaceContact,
    pub state: SpaceOpenState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpaceLocation {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpaceContact {
    pub email: String,
}

impl SpaceApi {
    pub fn new(config: &SpaceConfig, state: SpaceOpenState) -> Self {
        Self {
            api_compatibility: vec![SPACE_API_VERSION.to_string()],
            space: config.name.clone(),
            logo: config.logo.clone(),
            url: config.url.clone(),
            location: SpaceLocation {
                address: config.address.clone(),
                lat: config.lat,
                lon: config.lon,
            },
            contact: SpaceContact {
                email: config.email.clone(),
            },
            state,
        }
    }
}
