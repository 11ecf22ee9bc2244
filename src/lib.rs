//! Conveyor is the result-ingestion and state-propagation core of a
//! continuous-delivery orchestration engine. Distributed workers execute
//! pipeline jobs and report outcomes back here; we durably record the outcome
//! through the storage delegate, fan it out as events to interested
//! subscribers, and reconcile terminal statuses with the external
//! version-control host.

pub mod api;
pub mod conf;
pub mod events;
pub mod models;
pub mod storage;
pub mod vcs;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in epoch milliseconds. Used for event timestamps.
pub fn epoch_milli() -> u64 {
    let current_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();

    u64::try_from(current_epoch).unwrap()
}

/// Current time in epoch seconds. Run start/done timestamps use second
/// precision.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
