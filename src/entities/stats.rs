//! Stats entity - counters and cooldown stamps maintained by the alert logic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default first lifetime-energy milestone (kWh).
pub const FIRST_MILESTONE_KWH: u64 = 1000;

/// The best production day seen so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestDay {
    /// Local date of the record
    pub date: NaiveDate,
    /// Energy produced on that date
    pub kwh: f64,
}

/// Counters and timestamps persisted between restarts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    /// Last time a cleaning reminder was sent (epoch if never)
    pub last_reminder_date: DateTime<Utc>,
    /// Next lifetime-energy threshold that triggers a milestone alert
    pub next_milestone_kwh: u64,
    /// Production record, absent until the first daily pass
    pub best_day: Option<BestDay>,
    /// Last liveness alert, used for the cooldown
    pub last_liveness_alert: Option<DateTime<Utc>>,
    /// Last overheat alert, used for the cooldown
    pub last_temp_alert: Option<DateTime<Utc>>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            last_reminder_date: DateTime::UNIX_EPOCH,
            next_milestone_kwh: FIRST_MILESTONE_KWH,
            best_day: None,
            last_liveness_alert: None,
            last_temp_alert: None,
        }
    }
}
