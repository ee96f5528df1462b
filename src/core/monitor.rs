//! The monitoring service shared by the chat handler and the scheduled jobs.
//!
//! [`Monitor`] owns the telemetry cache and the persisted state. The state sits
//! behind one async mutex: network calls happen before the lock is taken, the
//! evaluation and the write-back happen while holding it, so chat commands and
//! scheduler jobs never interleave their mutations.

use crate::{
    config::{MonitoringConfig, StateStore},
    core::{
        aggregate::{self, Granularity},
        alerts,
        clock::Clock,
        messages,
        telemetry::{TelemetryCache, TelemetrySource},
    },
    entities::{PersistedState, Settings},
    errors::Result,
};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, instrument};

/// Persisted state together with the store it is flushed to.
#[derive(Debug)]
pub struct SharedState {
    data: PersistedState,
    store: StateStore,
}

impl SharedState {
    /// Loads the state from `store`.
    pub fn load(store: StateStore) -> Result<Self> {
        let data = store.load()?;
        Ok(Self { data, store })
    }

    /// Current state.
    #[must_use]
    pub const fn data(&self) -> &PersistedState {
        &self.data
    }

    /// Applies `f` and writes the result to disk if anything changed.
    ///
    /// `f` works on a copy: when it fails, or when the write fails, the in-memory
    /// state is left exactly as it was.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut PersistedState) -> Result<R>) -> Result<R> {
        let mut next = self.data.clone();
        let result = f(&mut next)?;
        if next != self.data {
            self.store.save(&next)?;
            self.data = next;
        }
        Ok(result)
    }
}

/// Telemetry cache, persisted state and alert configuration.
pub struct Monitor {
    cache: TelemetryCache,
    state: Mutex<SharedState>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    monitoring: MonitoringConfig,
}

impl Monitor {
    /// Builds the service, loading the persisted state from `store`.
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        clock: Arc<dyn Clock>,
        store: StateStore,
        tz: Tz,
        monitoring: MonitoringConfig,
    ) -> Result<Self> {
        let state = SharedState::load(store)?;
        Ok(Self {
            cache: TelemetryCache::new(source, Arc::clone(&clock), tz),
            state: Mutex::new(state),
            clock,
            tz,
            monitoring,
        })
    }

    /// Snapshot cache in front of the vendor API.
    #[must_use]
    pub const fn cache(&self) -> &TelemetryCache {
        &self.cache
    }

    /// Configured local time zone.
    #[must_use]
    pub const fn tz(&self) -> Tz {
        self.tz
    }

    /// Current instant.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today in the local time zone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.cache.today()
    }

    /// Exclusive access to the persisted state.
    pub async fn state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().await
    }

    /// Copy of the current settings.
    pub async fn settings(&self) -> Settings {
        self.state.lock().await.data().settings.clone()
    }

    /// Hourly outage / overheat / liveness check.
    ///
    /// Outside the active window no snapshot is fetched; the outage flag is cleared.
    #[instrument(skip(self))]
    pub async fn hourly_check(&self) -> Result<Vec<String>> {
        let hour = self.now().with_timezone(&self.tz).hour();
        if !self.monitoring.is_active_hour(hour) {
            let mut state = self.state.lock().await;
            state.update(|data| {
                alerts::reset_outside_window(&mut data.outage);
                Ok(())
            })?;
            return Ok(Vec::new());
        }

        let snapshot = self.cache.fetch_today(true).await?;
        let now = self.now();
        let mut state = self.state.lock().await;
        let found = state.update(|data| {
            alerts::evaluate_hourly(data, &snapshot, now, self.tz, &self.monitoring)
        })?;
        Ok(self.render(&found, &state.data().settings))
    }

    /// Minute-level escalation of an unresolved outage. Never touches the network.
    pub async fn escalation_check(&self) -> Result<Vec<String>> {
        let now = self.now();
        let mut state = self.state.lock().await;
        let found = state.update(|data| Ok(alerts::check_escalation(&mut data.outage, now)))?;
        Ok(self.render(found.as_slice(), &state.data().settings))
    }

    /// Daily best-day / milestone / cleaning pass.
    #[instrument(skip(self))]
    pub async fn daily_check(&self) -> Result<Vec<String>> {
        let snapshot = self.cache.fetch_today(true).await?;
        let now = self.now();
        let step = self.monitoring.milestone_step_kwh;
        let mut state = self.state.lock().await;
        let found =
            state.update(|data| Ok(alerts::evaluate_daily(data, &snapshot, now, self.tz, step)))?;
        Ok(self.render(&found, &state.data().settings))
    }

    /// Production report for the ISO week before the current one.
    #[instrument(skip(self))]
    pub async fn weekly_report(&self) -> Result<String> {
        let week_start = aggregate::previous_week(self.today());
        let kwh = aggregate::period_total(&self.cache, week_start, Granularity::Week).await?;
        info!("Weekly report for week of {}: {:.2} kWh", week_start, kwh);
        Ok(messages::weekly_report(week_start, kwh, &self.settings().await))
    }

    /// Production report for the month before the current one.
    #[instrument(skip(self))]
    pub async fn monthly_report(&self) -> Result<String> {
        let month_start = aggregate::previous_month(self.today());
        let kwh = aggregate::period_total(&self.cache, month_start, Granularity::Month).await?;
        info!("Monthly report for {}: {:.2} kWh", month_start, kwh);
        Ok(messages::monthly_report(month_start, kwh, &self.settings().await))
    }

    fn render(&self, found: &[alerts::Alert], settings: &Settings) -> Vec<String> {
        found
            .iter()
            .inspect(|alert| info!("Alert raised: {:?}", alert))
            .map(|alert| messages::alert(alert, settings, self.tz))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_hourly_check_persists_outage() -> Result<()> {
        init_test_tracing();
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 11, 0)));
        let source = Arc::new(FakeSource::default());
        source.set_snapshot(date(2024, 6, 3), idle_snapshot(utc(2024, 6, 3, 11, 0)));
        let (monitor, dir) = setup_test_monitor(&clock, &source)?;

        let sent = monitor.hourly_check().await?;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("not producing"));

        // the flag survived a reload from disk
        let reloaded = StateStore::new(dir.path().join("state.json")).load()?;
        assert!(reloaded.outage.is_system_down);
        assert_eq!(reloaded.outage.outage_start_time, Some(utc(2024, 6, 3, 11, 0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_hourly_check_outside_window_skips_fetch() -> Result<()> {
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 11, 0)));
        let source = Arc::new(FakeSource::default());
        source.set_snapshot(date(2024, 6, 3), idle_snapshot(utc(2024, 6, 3, 11, 0)));
        let (monitor, _dir) = setup_test_monitor(&clock, &source)?;

        monitor.hourly_check().await?;
        assert!(monitor.state().await.data().outage.is_system_down);

        clock.set(utc(2024, 6, 3, 19, 0));
        let sent = monitor.hourly_check().await?;
        assert!(sent.is_empty());
        assert_eq!(source.fetch_count(), 1);
        assert!(!monitor.state().await.data().outage.is_system_down);
        Ok(())
    }

    #[tokio::test]
    async fn test_escalation_after_fifteen_minutes() -> Result<()> {
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 11, 0)));
        let source = Arc::new(FakeSource::default());
        source.set_snapshot(date(2024, 6, 3), idle_snapshot(utc(2024, 6, 3, 11, 0)));
        let (monitor, _dir) = setup_test_monitor(&clock, &source)?;
        monitor.hourly_check().await?;

        clock.advance_secs(14 * 60);
        assert!(monitor.escalation_check().await?.is_empty());

        clock.advance_secs(60);
        let sent = monitor.escalation_check().await?;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("URGENT"));

        clock.advance_secs(60);
        assert!(monitor.escalation_check().await?.is_empty());
        assert_eq!(source.fetch_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_connectivity_failure_leaves_state_untouched() -> Result<()> {
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 11, 0)));
        let source = Arc::new(FakeSource::default());
        source.set_failing(true);
        let (monitor, dir) = setup_test_monitor(&clock, &source)?;

        assert!(monitor.hourly_check().await.is_err());
        assert_eq!(*monitor.state().await.data(), PersistedState::default());
        assert!(!dir.path().join("state.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_daily_check_and_reports() -> Result<()> {
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 21, 0)));
        let source = Arc::new(FakeSource::default());
        let mut today = energy_snapshot(12.0);
        today.lifetime_energy_kwh = Some(1050.0);
        source.set_snapshot(date(2024, 6, 3), today);
        for day in date(2024, 5, 27).iter_days().take(7) {
            source.set_snapshot(day, energy_snapshot(3.0));
        }
        let (monitor, _dir) = setup_test_monitor(&clock, &source)?;

        let sent = monitor.daily_check().await?;
        // milestone + first cleaning reminder; the first best day is recorded silently
        assert_eq!(sent.len(), 2);
        assert_eq!(monitor.state().await.data().stats.next_milestone_kwh, 2000);

        let weekly = monitor.weekly_report().await?;
        assert!(weekly.contains("21.00 kWh"));
        assert!(weekly.contains("2024-05-27"));

        let monthly = monitor.monthly_report().await?;
        // May 27..31 were seeded at 3 kWh each
        assert!(monthly.contains("May 2024"));
        assert!(monthly.contains("15.00 kWh"));
        Ok(())
    }

    #[test]
    fn test_failed_update_keeps_previous_state() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut state = SharedState::load(StateStore::new(dir.path().join("state.json")))?;

        let result: Result<()> = state.update(|data| {
            data.settings.temp_threshold = 99;
            Err(crate::errors::Error::validation("rejected"))
        });
        assert!(result.is_err());
        assert_eq!(state.data().settings.temp_threshold, 60);

        // no-op updates do not touch the disk
        state.update(|_| Ok(()))?;
        assert!(!dir.path().join("state.json").exists());
        Ok(())
    }
}
