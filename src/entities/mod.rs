//! Entity module - Contains the data models shared across the bot.
//! `Settings`, `Stats` and `OutageStatus` are the persisted groups written to the
//! state file; `Snapshot` is the in-memory view of one telemetry read.

pub mod outage;
pub mod settings;
pub mod snapshot;
pub mod stats;

pub use outage::OutageStatus;
pub use settings::{Language, Settings};
pub use snapshot::{DeviceReading, Snapshot, Weather};
pub use stats::{BestDay, Stats};

use serde::{Deserialize, Serialize};

/// Everything the bot persists, as one document.
///
/// Each group (and each field inside it) falls back to its default when absent,
/// so state files written by older versions keep loading.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    /// Admin-controlled configuration
    pub settings: Settings,
    /// Counters and cooldown timestamps
    pub stats: Stats,
    /// Current outage tracking
    pub outage: OutageStatus,
}
