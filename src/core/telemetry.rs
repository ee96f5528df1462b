//! Telemetry source contract and the same-day snapshot cache.
//!
//! Every vendor query is a full login → query → logout cycle, so repeated reads of
//! "today" (status commands, money commands, the aggregator's day lookups) are
//! served from a short-lived cache instead of hitting the API each time.

use crate::{
    core::clock::Clock,
    entities::Snapshot,
    errors::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// A cached snapshot of today is served for this long (seconds).
pub const FRESHNESS_WINDOW_SECS: i64 = 120;

/// The vendor telemetry API.
///
/// Failures to authenticate or reach the API are reported as
/// [`Error::Connectivity`](crate::errors::Error::Connectivity).
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Opens a session.
    async fn login(&self) -> Result<()>;
    /// Reads plant and device telemetry for the given local date.
    async fn fetch_snapshot(&self, date: NaiveDate) -> Result<Snapshot>;
    /// Closes the session.
    async fn logout(&self) -> Result<()>;
}

#[derive(Debug)]
struct CachedSnapshot {
    date: NaiveDate,
    fetched_at: DateTime<Utc>,
    snapshot: Arc<Snapshot>,
}

/// Deduplicates same-day snapshot fetches within [`FRESHNESS_WINDOW_SECS`].
pub struct TelemetryCache {
    source: Arc<dyn TelemetrySource>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    entry: RwLock<Option<CachedSnapshot>>,
    // login/logout share one vendor session, so live fetches must not interleave
    session: Mutex<()>,
}

impl TelemetryCache {
    /// Creates an empty cache in front of `source`.
    pub fn new(source: Arc<dyn TelemetrySource>, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self {
            source,
            clock,
            tz,
            entry: RwLock::new(None),
            session: Mutex::new(()),
        }
    }

    /// Today's date in the configured time zone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.tz).date_naive()
    }

    /// Returns the snapshot for `target_date`.
    ///
    /// A non-forced read of today is answered from the cache while the cached entry
    /// is younger than the freshness window. Everything else goes to the API; only
    /// results for today are stored. Failed fetches leave the cache untouched.
    #[instrument(skip(self))]
    pub async fn fetch(&self, force_refresh: bool, target_date: NaiveDate) -> Result<Arc<Snapshot>> {
        let now = self.clock.now();
        let is_today = target_date == now.with_timezone(&self.tz).date_naive();

        if !force_refresh && is_today {
            if let Some(snapshot) = self.fresh_entry(target_date, now).await {
                debug!("Serving snapshot for {} from cache", target_date);
                return Ok(snapshot);
            }
        }

        let snapshot = Arc::new(self.live_fetch(target_date).await?);

        if is_today {
            let mut entry = self.entry.write().await;
            *entry = Some(CachedSnapshot {
                date: target_date,
                fetched_at: now,
                snapshot: Arc::clone(&snapshot),
            });
        }

        Ok(snapshot)
    }

    /// Shorthand for [`Self::fetch`] on today's date.
    pub async fn fetch_today(&self, force_refresh: bool) -> Result<Arc<Snapshot>> {
        self.fetch(force_refresh, self.today()).await
    }

    async fn fresh_entry(&self, date: NaiveDate, now: DateTime<Utc>) -> Option<Arc<Snapshot>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|cached| cached.date == date)
            .filter(|cached| now - cached.fetched_at < Duration::seconds(FRESHNESS_WINDOW_SECS))
            .map(|cached| Arc::clone(&cached.snapshot))
    }

    async fn live_fetch(&self, date: NaiveDate) -> Result<Snapshot> {
        let _session = self.session.lock().await;
        info!("Fetching telemetry for {} from vendor API", date);

        self.source.login().await?;
        let result = self.source.fetch_snapshot(date).await;
        if let Err(e) = self.source.logout().await {
            warn!("Vendor logout failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::*;

    fn cache_for(clock: &Arc<ManualClock>, source: &Arc<FakeSource>) -> TelemetryCache {
        TelemetryCache::new(
            Arc::clone(source) as Arc<dyn TelemetrySource>,
            Arc::clone(clock) as Arc<dyn Clock>,
            chrono_tz::UTC,
        )
    }

    #[tokio::test]
    async fn test_same_day_reads_within_window_hit_cache() -> Result<()> {
        init_test_tracing();
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 11, 0)));
        let source = Arc::new(FakeSource::default());
        source.set_snapshot(date(2024, 6, 3), producing_snapshot(1500.0));
        let cache = cache_for(&clock, &source);

        let first = cache.fetch(false, date(2024, 6, 3)).await?;
        clock.advance_secs(119);
        let second = cache.fetch(false, date(2024, 6, 3)).await?;

        assert_eq!(source.fetch_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.login_count(), 1);
        assert_eq!(source.logout_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_or_forced_reads_go_live() -> Result<()> {
        init_test_tracing();
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 11, 0)));
        let source = Arc::new(FakeSource::default());
        let cache = cache_for(&clock, &source);

        cache.fetch(false, date(2024, 6, 3)).await?;
        cache.fetch(true, date(2024, 6, 3)).await?;
        assert_eq!(source.fetch_count(), 2);

        clock.advance_secs(FRESHNESS_WINDOW_SECS);
        cache.fetch(false, date(2024, 6, 3)).await?;
        assert_eq!(source.fetch_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_past_dates_are_never_cached() -> Result<()> {
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 11, 0)));
        let source = Arc::new(FakeSource::default());
        let cache = cache_for(&clock, &source);

        cache.fetch(false, date(2024, 6, 3)).await?;
        cache.fetch(false, date(2024, 6, 2)).await?;
        cache.fetch(false, date(2024, 6, 2)).await?;
        assert_eq!(source.fetch_count(), 3);

        // the past-date reads did not displace today's entry
        cache.fetch(false, date(2024, 6, 3)).await?;
        assert_eq!(source.fetch_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_does_not_poison_cache() -> Result<()> {
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 11, 0)));
        let source = Arc::new(FakeSource::default());
        source.set_snapshot(date(2024, 6, 3), producing_snapshot(900.0));
        let cache = cache_for(&clock, &source);

        let cached = cache.fetch(false, date(2024, 6, 3)).await?;

        source.set_failing(true);
        let forced = cache.fetch(true, date(2024, 6, 3)).await;
        assert!(matches!(forced, Err(Error::Connectivity { .. })));

        let again = cache.fetch(false, date(2024, 6, 3)).await?;
        assert!(Arc::ptr_eq(&cached, &again));
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_expires_at_day_rollover() -> Result<()> {
        let clock = Arc::new(ManualClock::new(utc(2024, 6, 3, 23, 59)));
        let source = Arc::new(FakeSource::default());
        let cache = cache_for(&clock, &source);

        cache.fetch_today(false).await?;
        clock.advance_secs(60);
        assert_eq!(cache.today(), date(2024, 6, 4));
        cache.fetch_today(false).await?;
        assert_eq!(source.fetch_count(), 2);
        Ok(())
    }
}
