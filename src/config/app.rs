//! Application configuration loading from config.toml
//!
//! Static deployment settings (time zone, chat channel, vendor endpoint, schedule)
//! live in `config.toml`. Every field has a default, so only what differs needs to
//! be written; [`AppConfig::validate`] rejects values that cannot work. Secrets are
//! read from the environment instead (see `main.rs`).

use crate::errors::{Error, Result};
use chrono_tz::Tz;
use cron::Schedule;
use serde::Deserialize;
use std::{path::Path, path::PathBuf, str::FromStr};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// IANA time zone used for "today", the active window and the schedule
    pub timezone: String,
    /// Location of the JSON state file
    pub state_file: PathBuf,
    /// Prefix that marks a chat message as a command (may be empty)
    pub command_prefix: String,
    /// Discord channel that receives alerts and is listened to for commands
    pub notification_channel_id: u64,
    /// Alert tuning
    pub monitoring: MonitoringConfig,
    /// Vendor API endpoint
    pub api: ApiConfig,
    /// Report schedule
    pub schedule: ScheduleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Paris".to_string(),
            state_file: PathBuf::from("data/state.json"),
            command_prefix: "!".to_string(),
            notification_channel_id: 0,
            monitoring: MonitoringConfig::default(),
            api: ApiConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

/// `[monitoring]` section
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MonitoringConfig {
    /// First local hour (inclusive) of the active monitoring window
    pub active_start_hour: u32,
    /// Last local hour (inclusive) of the active monitoring window
    pub active_end_hour: u32,
    /// Distance between two lifetime-energy milestones (kWh)
    pub milestone_step_kwh: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            active_start_hour: 10,
            active_end_hour: 15,
            milestone_step_kwh: 1000,
        }
    }
}

impl MonitoringConfig {
    /// Whether the given local hour falls in the active monitoring window.
    #[must_use]
    pub const fn is_active_hour(&self, hour: u32) -> bool {
        hour >= self.active_start_hour && hour <= self.active_end_hour
    }
}

/// `[api]` section
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the vendor cloud API, without trailing slash
    pub base_url: String,
    /// Plant identifier in the vendor account
    pub plant_id: String,
}

/// `[schedule]` section. Cron expressions use the six-field form
/// `sec min hour day-of-month month day-of-week`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Best-day / milestone / cleaning pass
    pub daily: String,
    /// Report on the previous ISO week
    pub weekly: String,
    /// Report on the previous month
    pub monthly: String,
    /// Outage / overheat / liveness check
    pub hourly: String,
    /// Period of the urgent-escalation check
    pub escalation_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily: "0 0 21 * * *".to_string(),
            weekly: "0 0 9 * * Mon".to_string(),
            monthly: "0 0 9 1 * *".to_string(),
            hourly: "0 0 * * * *".to_string(),
            escalation_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Parses the configured time zone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| Error::Config {
            message: format!("Invalid timezone `{}`: {e}", self.timezone),
        })
    }

    /// Checks the values that have no usable default.
    pub fn validate(&self) -> Result<()> {
        self.tz()?;

        if self.notification_channel_id == 0 {
            return Err(config_error("notification_channel_id must be set"));
        }
        if self.api.base_url.is_empty() || self.api.plant_id.is_empty() {
            return Err(config_error("[api] base_url and plant_id must be set"));
        }

        let window = &self.monitoring;
        if window.active_end_hour > 23 || window.active_start_hour > window.active_end_hour {
            return Err(config_error(format!(
                "invalid active window {}..={}",
                window.active_start_hour, window.active_end_hour
            )));
        }
        if window.milestone_step_kwh == 0 {
            return Err(config_error("milestone_step_kwh must be positive"));
        }

        for expr in [
            &self.schedule.daily,
            &self.schedule.weekly,
            &self.schedule.monthly,
            &self.schedule.hourly,
        ] {
            parse_schedule(expr)?;
        }
        if self.schedule.escalation_interval_secs == 0 {
            return Err(config_error("escalation_interval_secs must be positive"));
        }

        Ok(())
    }
}

/// Parses a cron expression from the `[schedule]` section.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    Schedule::from_str(expr).map_err(|e| config_error(format!("Invalid cron expression `{expr}`: {e}")))
}

fn config_error(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

/// Loads and validates the configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value fails [`AppConfig::validate`]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `CONFIG_PATH`, or `./config.toml` when unset.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}
