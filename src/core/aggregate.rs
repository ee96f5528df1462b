//! Period aggregation of daily energy production.
//!
//! The only data source is the per-day figure read through the
//! [`TelemetryCache`]; weeks, months and years are plain sums over generated day
//! sequences, so a month total always equals the sum of its days.

use crate::{
    core::telemetry::TelemetryCache,
    errors::{Error, Result},
};
use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, instrument};

/// Aggregation window for energy totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    /// A single date
    Day,
    /// The ISO week (Monday to Sunday) containing the date
    Week,
    /// The calendar month containing the date
    Month,
    /// The calendar year containing the date
    Year,
}

/// Production of one month, as listed in the history report.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthTotal {
    /// Month number (1-12)
    pub month: u32,
    /// Energy produced in that month
    pub kwh: f64,
}

/// Every date of the period containing `date`, in order.
#[must_use]
pub fn days_in_period(date: NaiveDate, granularity: Granularity) -> Vec<NaiveDate> {
    match granularity {
        Granularity::Day => vec![date],
        Granularity::Week => {
            let monday =
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
            monday.iter_days().take(7).collect()
        }
        Granularity::Month => {
            let first = date.with_day(1).unwrap_or(date);
            first
                .iter_days()
                .take_while(|d| d.month() == first.month())
                .collect()
        }
        Granularity::Year => {
            let first = date.with_ordinal(1).unwrap_or(date);
            first
                .iter_days()
                .take_while(|d| d.year() == first.year())
                .collect()
        }
    }
}

/// Energy produced on one date.
///
/// Dates after today are not queried. A snapshot without device energy figures,
/// or a source reporting missing data, counts as zero production; connectivity
/// failures propagate.
pub async fn day_total(cache: &TelemetryCache, date: NaiveDate) -> Result<f64> {
    if date > cache.today() {
        return Ok(0.0);
    }

    match cache.fetch(false, date).await {
        Ok(snapshot) => Ok(snapshot.energy_today_kwh().unwrap_or(0.0)),
        Err(Error::MissingData { what }) => {
            debug!("No {} for {}, counting as zero", what, date);
            Ok(0.0)
        }
        Err(e) => Err(e),
    }
}

/// Total energy produced over the period of `granularity` containing `date`.
#[instrument(skip(cache))]
pub async fn period_total(
    cache: &TelemetryCache,
    date: NaiveDate,
    granularity: Granularity,
) -> Result<f64> {
    if granularity == Granularity::Year {
        let months = year_breakdown(cache, date.year()).await?;
        return Ok(months.iter().map(|m| m.kwh).sum());
    }

    sum_days(cache, days_in_period(date, granularity)).await
}

async fn sum_days(cache: &TelemetryCache, days: Vec<NaiveDate>) -> Result<f64> {
    let mut total = 0.0;
    for day in days {
        total += day_total(cache, day).await?;
    }
    Ok(total)
}

/// Per-month production of `year`, skipping months that produced nothing.
pub async fn year_breakdown(cache: &TelemetryCache, year: i32) -> Result<Vec<MonthTotal>> {
    let mut months = Vec::new();
    for month in 1..=12 {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            continue;
        };
        let kwh = sum_days(cache, days_in_period(first, Granularity::Month)).await?;
        if kwh > 0.0 {
            months.push(MonthTotal { month, kwh });
        }
    }
    Ok(months)
}

/// First day of the ISO week before the one containing `date`.
#[must_use]
pub fn previous_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()) + 7)
}

/// First day of the month before the one containing `date`.
#[must_use]
pub fn previous_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    let last_of_previous = first.pred_opt().unwrap_or(first);
    last_of_previous.with_day(1).unwrap_or(last_of_previous)
}
