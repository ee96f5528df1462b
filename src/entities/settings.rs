//! Settings entity - admin-controlled configuration persisted in the state file.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::warn;

/// Temperature thresholds must be strictly above this value (°C).
pub const MIN_TEMP_THRESHOLD: i32 = 30;

/// Longest accepted cleaning interval: ten years.
pub const MAX_CLEANING_INTERVAL_WEEKS: u32 = 520;

/// Reply language for alerts and command responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// French
    Fr,
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            other => Err(Error::validation(format!("unknown language `{other}`"))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::En => f.write_str("en"),
            Self::Fr => f.write_str("fr"),
        }
    }
}

/// Admin-controlled settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Reply language
    pub language: Language,
    /// Price of one kWh, used for the money commands
    pub cost_per_kwh: f64,
    /// Symbol appended to money amounts
    pub currency_symbol: String,
    /// Weeks between two panel cleaning reminders
    pub cleaning_interval_weeks: u32,
    /// Inverter temperature (°C) at or above which an overheat alert fires
    pub temp_threshold: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: Language::En,
            cost_per_kwh: 0.20,
            currency_symbol: "€".to_string(),
            cleaning_interval_weeks: 4,
            temp_threshold: 60,
        }
    }
}

impl Settings {
    /// Sets the price per kWh. Rejects zero, negative and non-finite values.
    pub fn set_cost_per_kwh(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::validation(format!(
                "cost per kWh must be positive, got {value}"
            )));
        }
        self.cost_per_kwh = value;
        Ok(())
    }

    /// Sets the cleaning interval. Rejects zero and anything above
    /// [`MAX_CLEANING_INTERVAL_WEEKS`].
    pub fn set_cleaning_interval_weeks(&mut self, weeks: u32) -> Result<()> {
        if !(1..=MAX_CLEANING_INTERVAL_WEEKS).contains(&weeks) {
            return Err(Error::validation(format!(
                "cleaning interval must be between 1 and {MAX_CLEANING_INTERVAL_WEEKS} weeks, got {weeks}"
            )));
        }
        self.cleaning_interval_weeks = weeks;
        Ok(())
    }

    /// Sets the overheat threshold. Must exceed [`MIN_TEMP_THRESHOLD`].
    pub fn set_temp_threshold(&mut self, celsius: i32) -> Result<()> {
        if celsius <= MIN_TEMP_THRESHOLD {
            return Err(Error::validation(format!(
                "temperature threshold must exceed {MIN_TEMP_THRESHOLD}°C, got {celsius}"
            )));
        }
        self.temp_threshold = celsius;
        Ok(())
    }

    /// Replaces every value the setters would refuse with its default.
    ///
    /// Applied to settings read back from the state file, which may have been
    /// edited by hand.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if let Err(e) = self.clone().set_cost_per_kwh(self.cost_per_kwh) {
            warn!("Stored setting rejected, using default: {}", e);
            self.cost_per_kwh = defaults.cost_per_kwh;
        }
        if let Err(e) = self.clone().set_cleaning_interval_weeks(self.cleaning_interval_weeks) {
            warn!("Stored setting rejected, using default: {}", e);
            self.cleaning_interval_weeks = defaults.cleaning_interval_weeks;
        }
        if let Err(e) = self.clone().set_temp_threshold(self.temp_threshold) {
            warn!("Stored setting rejected, using default: {}", e);
            self.temp_threshold = defaults.temp_threshold;
        }
        self
    }
}
