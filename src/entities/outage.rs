//! Outage status entity.
//!
//! The transition methods are the only way the alert logic changes this state,
//! which keeps `outage_start_time.is_some() == is_system_down` at all times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracks whether the plant is currently considered down.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutageStatus {
    /// True between an outage onset and the following recovery
    pub is_system_down: bool,
    /// When the current outage started, set iff `is_system_down`
    pub outage_start_time: Option<DateTime<Utc>>,
    /// Whether the urgent escalation for the current outage was sent
    pub urgent_alert_sent: bool,
}

impl OutageStatus {
    /// Enters the down state, stamping the start time.
    pub fn mark_down(&mut self, now: DateTime<Utc>) {
        self.is_system_down = true;
        self.outage_start_time = Some(now);
        self.urgent_alert_sent = false;
    }

    /// Leaves the down state. Returns when the outage had started.
    pub fn mark_up(&mut self) -> Option<DateTime<Utc>> {
        self.is_system_down = false;
        self.urgent_alert_sent = false;
        self.outage_start_time.take()
    }

    /// Resets to the neutral state without reporting anything.
    /// Returns true if something was actually cleared.
    pub fn clear(&mut self) -> bool {
        let changed = *self != Self::default();
        *self = Self::default();
        changed
    }

    /// Repairs a state file that violates the start-time invariant.
    #[must_use]
    pub fn normalized(self) -> Self {
        match (self.is_system_down, self.outage_start_time) {
            (true, Some(_)) => self,
            _ => Self::default(),
        }
    }
}
