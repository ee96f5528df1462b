//! Shared test utilities for `SolarBuddy`.
//!
//! Provides a hand-driven clock, an in-memory telemetry source, a notifier that
//! records what it was asked to send, and snapshot builders with sensible
//! defaults.
#![allow(clippy::unwrap_used)]

use crate::{
    config::{MonitoringConfig, StateStore},
    core::{clock::Clock, monitor::Monitor, notify::Notifier, telemetry::TelemetrySource},
    entities::{DeviceReading, Snapshot},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tracing_subscriber::EnvFilter;

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_test_writer()
        .try_init();
}

/// UTC instant from calendar fields.
pub(crate) fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(crate) fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub(crate) fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-memory telemetry source. Dates without a seeded snapshot return an empty one.
#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    snapshots: Mutex<HashMap<NaiveDate, Snapshot>>,
    failing: AtomicBool,
    logins: AtomicUsize,
    fetches: AtomicUsize,
    logouts: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn set_snapshot(&self, date: NaiveDate, snapshot: Snapshot) {
        self.snapshots.lock().unwrap().insert(date, snapshot);
    }

    /// While failing, every login is rejected as a connectivity error.
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub(crate) fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetrySource for FakeSource {
    async fn login(&self) -> Result<()> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Connectivity {
                message: "vendor unreachable".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_snapshot(&self, date: NaiveDate) -> Result<Snapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .get(&date)
            .cloned()
            .unwrap_or_default())
    }

    async fn logout(&self) -> Result<()> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Collects every message instead of delivering it.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) {
        self.sent.lock().unwrap().push(text.to_string());
    }
}

fn device(power_w: f64) -> DeviceReading {
    DeviceReading {
        serial: "INV-0001".to_string(),
        power_w: Some(power_w),
        ..DeviceReading::default()
    }
}

/// One device producing `power_w`, no other figures.
pub(crate) fn producing_snapshot(power_w: f64) -> Snapshot {
    Snapshot {
        devices: vec![device(power_w)],
        ..Snapshot::default()
    }
}

/// One device reporting at `last_update` with the given output.
pub(crate) fn live_snapshot(power_w: f64, last_update: DateTime<Utc>) -> Snapshot {
    let mut snapshot = producing_snapshot(power_w);
    snapshot.devices[0].last_update = Some(last_update);
    snapshot
}

/// A freshly reporting device producing nothing.
pub(crate) fn idle_snapshot(now: DateTime<Utc>) -> Snapshot {
    live_snapshot(0.0, now)
}

/// A freshly reporting, producing device at `temperature_c`.
pub(crate) fn hot_snapshot(temperature_c: f64, now: DateTime<Utc>) -> Snapshot {
    let mut snapshot = live_snapshot(1200.0, now);
    snapshot.devices[0].temperature_c = Some(temperature_c);
    snapshot
}

/// A producing device that made `kwh` on the snapshot's date.
pub(crate) fn energy_snapshot(kwh: f64) -> Snapshot {
    let mut snapshot = producing_snapshot(1000.0);
    snapshot.devices[0].energy_today_kwh = Some(kwh);
    snapshot
}

/// Plant-level lifetime total only.
pub(crate) fn lifetime_snapshot(total_kwh: f64) -> Snapshot {
    Snapshot {
        lifetime_energy_kwh: Some(total_kwh),
        ..Snapshot::default()
    }
}

/// Builds a [`Monitor`] over the fake source, in UTC with the default
/// monitoring window, persisting to `state.json` in a fresh temp dir.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub(crate) fn setup_test_monitor(
    clock: &Arc<ManualClock>,
    source: &Arc<FakeSource>,
) -> Result<(Monitor, tempfile::TempDir)> {
    let dir = tempfile::tempdir()?;
    let monitor = Monitor::new(
        Arc::clone(source) as Arc<dyn TelemetrySource>,
        Arc::clone(clock) as Arc<dyn Clock>,
        StateStore::new(dir.path().join("state.json")),
        chrono_tz::UTC,
        MonitoringConfig::default(),
    )?;
    Ok((monitor, dir))
}
