//! Alert state machine.
//!
//! All functions here are pure transitions over the persisted state: they take the
//! current instant as an argument, mutate the relevant group and return the alerts
//! to send. Fetching, persisting and delivering are the caller's business.
//!
//! ```text
//!            power == 0                      15 min elapsed
//!   Up ─────────────────────► Down ─────────────────────────► Down + urgent
//!    ▲                         │                                   │
//!    └──────── power > 0 ──────┴──────────── power > 0 ────────────┘
//!
//!   leaving the active window resets to Up without any alert
//! ```

use crate::{
    config::MonitoringConfig,
    entities::{BestDay, OutageStatus, PersistedState, Snapshot},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

/// A snapshot whose stalest device update is older than this triggers a liveness alert.
pub const LIVENESS_STALE_AFTER_SECS: i64 = 2 * 3600;

/// Minimum spacing between two liveness (or two overheat) alerts.
pub const ALERT_COOLDOWN_SECS: i64 = 6 * 3600;

/// An outage still unresolved after this long is escalated.
pub const ESCALATION_DELAY_SECS: i64 = 15 * 60;

/// Something worth telling the chat group.
#[derive(Clone, Debug, PartialEq)]
pub enum Alert {
    /// The vendor cloud has not heard from a device for a while
    Liveness {
        /// Stalest device update
        last_update: DateTime<Utc>,
    },
    /// A device is at or above the configured temperature threshold
    Overheat {
        /// Hottest device temperature
        temperature_c: f64,
        /// Configured threshold
        threshold_c: i32,
    },
    /// Output power came back after an outage
    Recovery {
        /// How long the outage lasted
        down_for: Option<Duration>,
    },
    /// Output power dropped to zero during the active window
    Outage,
    /// The outage has lasted past the escalation delay
    UrgentOutage {
        /// When the outage started
        since: DateTime<Utc>,
    },
    /// Today beat the best production day
    BestDay {
        /// Date of the new record
        date: NaiveDate,
        /// New record
        kwh: f64,
        /// Record it replaces
        previous_kwh: f64,
    },
    /// Lifetime production crossed a milestone
    Milestone {
        /// The milestone crossed
        kwh: u64,
    },
    /// Time to clean the panels
    CleaningReminder {
        /// Configured cleaning interval
        weeks: u32,
    },
}

fn cooldown_elapsed(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last.is_none_or(|at| now - at >= Duration::seconds(ALERT_COOLDOWN_SECS))
}

/// Clears any outage flag when the active window is over. No alert is produced.
pub fn reset_outside_window(outage: &mut OutageStatus) {
    if outage.clear() {
        info!("Outside active monitoring window, outage flag cleared");
    }
}

/// Runs the hourly checks against a fresh snapshot.
///
/// Outside the active window the outage flag is cleared and nothing else happens.
/// Inside it, liveness, overheat, recovery and outage onset are evaluated in that
/// order.
///
/// # Errors
/// Returns [`Error::MissingData`] when no device reports its output power.
pub fn evaluate_hourly(
    state: &mut PersistedState,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    tz: Tz,
    monitoring: &MonitoringConfig,
) -> Result<Vec<Alert>> {
    let hour = now.with_timezone(&tz).hour();
    if !monitoring.is_active_hour(hour) {
        reset_outside_window(&mut state.outage);
        return Ok(Vec::new());
    }

    let power = snapshot
        .total_power_w()
        .ok_or_else(|| Error::missing("device data"))?;
    let mut alerts = Vec::new();

    if let Some(last_update) = snapshot.stalest_update() {
        let stale = now - last_update > Duration::seconds(LIVENESS_STALE_AFTER_SECS);
        if stale && cooldown_elapsed(state.stats.last_liveness_alert, now) {
            state.stats.last_liveness_alert = Some(now);
            alerts.push(Alert::Liveness { last_update });
        }
    }

    if let Some(temperature_c) = snapshot.max_temperature_c() {
        let threshold_c = state.settings.temp_threshold;
        if temperature_c >= f64::from(threshold_c)
            && cooldown_elapsed(state.stats.last_temp_alert, now)
        {
            state.stats.last_temp_alert = Some(now);
            alerts.push(Alert::Overheat {
                temperature_c,
                threshold_c,
            });
        }
    }

    if power > 0.0 && state.outage.is_system_down {
        let started = state.outage.mark_up();
        alerts.push(Alert::Recovery {
            down_for: started.map(|at| now - at),
        });
    } else if power <= 0.0 && !state.outage.is_system_down {
        state.outage.mark_down(now);
        alerts.push(Alert::Outage);
    }

    debug!("Hourly evaluation at {}: power {} W, {} alert(s)", now, power, alerts.len());
    Ok(alerts)
}

/// Escalates an outage that has lasted at least [`ESCALATION_DELAY_SECS`].
/// Fires at most once per outage.
pub fn check_escalation(outage: &mut OutageStatus, now: DateTime<Utc>) -> Option<Alert> {
    if !outage.is_system_down || outage.urgent_alert_sent {
        return None;
    }
    let since = outage.outage_start_time?;
    if now - since < Duration::seconds(ESCALATION_DELAY_SECS) {
        return None;
    }
    outage.urgent_alert_sent = true;
    Some(Alert::UrgentOutage { since })
}

/// Runs the once-a-day checks: best day, lifetime milestone and cleaning reminder.
///
/// `snapshot` must be today's. The first production figure ever seen becomes the
/// best day silently; later ones must strictly beat it.
pub fn evaluate_daily(
    state: &mut PersistedState,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    tz: Tz,
    milestone_step_kwh: u64,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let today = now.with_timezone(&tz).date_naive();

    if let Some(kwh) = snapshot.energy_today_kwh() {
        match state.stats.best_day.as_ref().map(|best| best.kwh) {
            None => state.stats.best_day = Some(BestDay { date: today, kwh }),
            Some(previous_kwh) if kwh > previous_kwh => {
                alerts.push(Alert::BestDay {
                    date: today,
                    kwh,
                    previous_kwh,
                });
                state.stats.best_day = Some(BestDay { date: today, kwh });
            }
            Some(_) => {}
        }
    }

    if let Some(total) = snapshot.lifetime_energy_kwh {
        if let Some(alert) = advance_milestone(state, total, milestone_step_kwh) {
            alerts.push(alert);
        }
    }

    let weeks = state.settings.cleaning_interval_weeks;
    let interval = Duration::weeks(i64::from(weeks));
    if now - state.stats.last_reminder_date >= interval {
        state.stats.last_reminder_date = now;
        alerts.push(Alert::CleaningReminder { weeks });
    }

    alerts
}

fn advance_milestone(state: &mut PersistedState, total_kwh: f64, step: u64) -> Option<Alert> {
    let next = state.stats.next_milestone_kwh;
    #[allow(clippy::cast_precision_loss)]
    let next_kwh = next as f64;
    if step == 0 || total_kwh < next_kwh {
        return None;
    }

    // Lifetime totals are far below 2^53, the truncation only drops the fraction.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole_kwh = total_kwh.floor() as u64;
    let highest_crossed = whole_kwh / step * step;
    state.stats.next_milestone_kwh = highest_crossed + step;

    Some(Alert::Milestone {
        kwh: highest_crossed.max(next),
    })
}
