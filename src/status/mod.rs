// Device status store and liveness tracking

mod liveness;
mod record;
mod store;

pub use liveness::LivenessTracker;
pub use record::{format_stamp, StatusRecord, LAST_UPDATE_FIELD, STAMP_FORMAT};
pub use store::StatusStore;
