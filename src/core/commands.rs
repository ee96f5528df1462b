//! Text command parsing and execution.
//!
//! A command is a leading keyword (one or two words, case-insensitive) after the
//! configured prefix, optionally followed by a single argument. Text that does not
//! start with a known keyword is ignored. Execution only depends on the
//! [`Monitor`]; the chat layer supplies the caller's admin status and sends back
//! whatever reply comes out.

use crate::{
    core::{
        aggregate::{self, Granularity},
        messages::{self, SettingChange, StatusView},
        monitor::Monitor,
    },
    entities::{
        Language, Settings,
        settings::{MAX_CLEANING_INTERVAL_WEEKS, MIN_TEMP_THRESHOLD},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, Duration};
use tracing::{error, info, instrument, warn};

/// Oldest year accepted by `history`.
const MIN_HISTORY_YEAR: i32 = 2000;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Current production and inverter state
    Status,
    /// Energy produced today
    Today,
    /// Lifetime production
    Total,
    /// Value of today's production
    MoneyToday,
    /// Value of the lifetime production
    MoneyTotal,
    /// Panel cleaning schedule
    Cleaning,
    /// Today compared to yesterday
    Compare,
    /// Weather at the plant
    Weather,
    /// Monthly production of a year (current year when absent)
    History(Option<i32>),
    /// Command list
    Help,
    /// Admin: reply language
    SetLanguage(Language),
    /// Admin: price per kWh
    SetCost(f64),
    /// Admin: cleaning interval in weeks
    SetCleaningWeeks(u32),
    /// Admin: overheat threshold in °C
    SetTempThreshold(i32),
}

impl Command {
    /// Parses a chat message.
    ///
    /// Returns `None` for text that is not a command, `Some(Err(_))` for a known
    /// keyword with a bad argument.
    #[must_use]
    pub fn parse(text: &str, prefix: &str) -> Option<Result<Self>> {
        let body = text.trim().strip_prefix(prefix)?;
        let lowered = body.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let (&keyword, rest) = words.split_first()?;

        let command = match keyword {
            "status" => Ok(Self::Status),
            "today" => Ok(Self::Today),
            "total" => Ok(Self::Total),
            "cleaning" => Ok(Self::Cleaning),
            "compare" => Ok(Self::Compare),
            "weather" => Ok(Self::Weather),
            "help" => Ok(Self::Help),
            "history" => parse_history(rest),
            "money" => match rest.first() {
                Some(&"today") => Ok(Self::MoneyToday),
                Some(&"total") => Ok(Self::MoneyTotal),
                _ => Err(Error::validation("expected `money today` or `money total`")),
            },
            "set" => parse_set(rest),
            _ => return None,
        };
        Some(command)
    }

    /// Whether only group administrators may run this command.
    #[must_use]
    pub const fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::SetLanguage(_)
                | Self::SetCost(_)
                | Self::SetCleaningWeeks(_)
                | Self::SetTempThreshold(_)
        )
    }
}

fn single_argument<'a>(args: &[&'a str], name: &str) -> Result<&'a str> {
    match args {
        [value] => Ok(value),
        _ => Err(Error::validation(format!("`{name}` takes exactly one argument"))),
    }
}

fn parse_history(args: &[&str]) -> Result<Command> {
    match args {
        [] => Ok(Command::History(None)),
        [year] => {
            let year: i32 = year
                .parse()
                .map_err(|_| Error::validation(format!("`{year}` is not a year")))?;
            if !(MIN_HISTORY_YEAR..=9999).contains(&year) {
                return Err(Error::validation(format!("year {year} out of range")));
            }
            Ok(Command::History(Some(year)))
        }
        _ => Err(Error::validation("`history` takes at most one argument")),
    }
}

fn parse_set(args: &[&str]) -> Result<Command> {
    let Some((&setting, rest)) = args.split_first() else {
        return Err(Error::validation("`set` needs a setting name"));
    };

    match setting {
        "language" => {
            let value = single_argument(rest, "set language")?;
            Ok(Command::SetLanguage(value.parse()?))
        }
        "cost" => {
            let value = single_argument(rest, "set cost")?;
            // accept a decimal comma as well as a decimal point
            let cost: f64 = value
                .replace(',', ".")
                .parse()
                .map_err(|_| Error::validation(format!("`{value}` is not a price")))?;
            if !cost.is_finite() || cost <= 0.0 {
                return Err(Error::validation("price per kWh must be positive"));
            }
            Ok(Command::SetCost(cost))
        }
        "cleaning" => {
            let value = single_argument(rest, "set cleaning")?;
            let weeks: u32 = value
                .parse()
                .map_err(|_| Error::validation(format!("`{value}` is not a number of weeks")))?;
            if !(1..=MAX_CLEANING_INTERVAL_WEEKS).contains(&weeks) {
                return Err(Error::validation(format!(
                    "cleaning interval must be between 1 and {MAX_CLEANING_INTERVAL_WEEKS} weeks"
                )));
            }
            Ok(Command::SetCleaningWeeks(weeks))
        }
        "temp" => {
            let value = single_argument(rest, "set temp")?;
            let celsius: i32 = value
                .parse()
                .map_err(|_| Error::validation(format!("`{value}` is not a temperature")))?;
            if celsius <= MIN_TEMP_THRESHOLD {
                return Err(Error::validation("temperature threshold too low"));
            }
            Ok(Command::SetTempThreshold(celsius))
        }
        other => Err(Error::validation(format!("unknown setting `{other}`"))),
    }
}

/// Who sent a message, as far as the dispatcher cares.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Chat user id, for logging
    pub user_id: String,
    /// Whether the user is a group administrator
    pub is_admin: bool,
}

/// Handles one inbound message. Returns the reply to send, if any.
///
/// Every error is turned into a localized reply here; nothing propagates back to
/// the chat layer.
#[instrument(skip(monitor, prefix))]
pub async fn handle_message(monitor: &Monitor, text: &str, prefix: &str, caller: &Caller) -> Option<String> {
    let parsed = Command::parse(text, prefix)?;
    let outcome = match parsed {
        Ok(command) if command.requires_admin() && !caller.is_admin => Err(Error::Unauthorized {
            user_id: caller.user_id.clone(),
        }),
        Ok(command) => {
            info!("User {} ran {:?}", caller.user_id, command);
            execute(monitor, command, prefix).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(reply) => Some(reply),
        Err(e) => {
            let lang = monitor.settings().await.language;
            Some(error_reply(&e, lang, prefix))
        }
    }
}

/// Maps an error to the reply shown to the user, logging it on the way.
#[must_use]
pub fn error_reply(error: &Error, lang: Language, prefix: &str) -> String {
    match error {
        Error::Validation { .. } => {
            warn!("Rejected command: {}", error);
            messages::invalid_command(lang, prefix)
        }
        Error::Unauthorized { .. } => {
            warn!("{}", error);
            messages::not_authorized(lang)
        }
        _ => {
            error!("Command failed: {}", error);
            messages::generic_error(lang)
        }
    }
}

/// Runs a parsed command and renders its reply.
pub async fn execute(monitor: &Monitor, command: Command, prefix: &str) -> Result<String> {
    let cache = monitor.cache();
    let today = monitor.today();

    match command {
        Command::Status => {
            let snapshot = cache.fetch_today(false).await?;
            let power_w = snapshot
                .total_power_w()
                .ok_or_else(|| Error::missing("device data"))?;
            let state = monitor.state().await;
            let view = StatusView {
                power_w,
                temperature_c: snapshot.max_temperature_c(),
                last_update: snapshot.stalest_update(),
                energy_today_kwh: snapshot.energy_today_kwh().unwrap_or(0.0),
                is_down: state.data().outage.is_system_down,
            };
            Ok(messages::status(&view, state.data().settings.language, monitor.tz()))
        }
        Command::Today => {
            let kwh = aggregate::period_total(cache, today, Granularity::Day).await?;
            Ok(messages::energy_today(kwh, monitor.settings().await.language))
        }
        Command::Total => {
            let kwh = lifetime_kwh(monitor).await?;
            Ok(messages::energy_lifetime(kwh, monitor.settings().await.language))
        }
        Command::MoneyToday => {
            let kwh = aggregate::period_total(cache, today, Granularity::Day).await?;
            Ok(messages::money_today(kwh, &monitor.settings().await))
        }
        Command::MoneyTotal => {
            let kwh = lifetime_kwh(monitor).await?;
            Ok(messages::money_lifetime(kwh, &monitor.settings().await))
        }
        Command::Cleaning => {
            let state = monitor.state().await;
            let data = state.data();
            let weeks = data.settings.cleaning_interval_weeks;
            let last = data.stats.last_reminder_date;
            let last_local = (last != DateTime::UNIX_EPOCH)
                .then(|| last.with_timezone(&monitor.tz()).date_naive());
            let next_due = last_local
                .unwrap_or(today)
                .checked_add_signed(Duration::weeks(i64::from(weeks)))
                .ok_or_else(|| {
                    Error::validation(format!("cleaning interval of {weeks} weeks is out of range"))
                })?;
            Ok(messages::cleaning_status(last_local, next_due, weeks, data.settings.language))
        }
        Command::Compare => {
            let today_kwh = aggregate::period_total(cache, today, Granularity::Day).await?;
            let yesterday = today.pred_opt().unwrap_or(today);
            let yesterday_kwh = aggregate::period_total(cache, yesterday, Granularity::Day).await?;
            Ok(messages::comparison(today_kwh, yesterday_kwh, monitor.settings().await.language))
        }
        Command::Weather => {
            let snapshot = cache.fetch_today(false).await?;
            let weather = snapshot
                .weather
                .as_ref()
                .ok_or_else(|| Error::missing("weather"))?;
            Ok(messages::weather(weather, monitor.settings().await.language))
        }
        Command::History(year) => {
            let year = year.unwrap_or_else(|| today.year());
            let months = aggregate::year_breakdown(cache, year).await?;
            Ok(messages::history(year, &months, monitor.settings().await.language))
        }
        Command::Help => Ok(messages::help(monitor.settings().await.language, prefix)),
        Command::SetLanguage(language) => {
            update_settings(monitor, SettingChange::Language, |s| {
                s.language = language;
                Ok(())
            })
            .await
        }
        Command::SetCost(cost) => {
            update_settings(monitor, SettingChange::Cost, |s| s.set_cost_per_kwh(cost)).await
        }
        Command::SetCleaningWeeks(weeks) => {
            update_settings(monitor, SettingChange::CleaningInterval, |s| {
                s.set_cleaning_interval_weeks(weeks)
            })
            .await
        }
        Command::SetTempThreshold(celsius) => {
            update_settings(monitor, SettingChange::TempThreshold, |s| {
                s.set_temp_threshold(celsius)
            })
            .await
        }
    }
}

async fn lifetime_kwh(monitor: &Monitor) -> Result<f64> {
    let snapshot = monitor.cache().fetch_today(false).await?;
    snapshot
        .lifetime_energy_kwh
        .ok_or_else(|| Error::missing("plant lifetime energy"))
}

async fn update_settings(
    monitor: &Monitor,
    change: SettingChange,
    apply: impl FnOnce(&mut Settings) -> Result<()>,
) -> Result<String> {
    let mut state = monitor.state().await;
    state.update(|data| apply(&mut data.settings))?;
    info!("Settings updated: {:?}", change);
    Ok(messages::setting_updated(&state.data().settings, change))
}
