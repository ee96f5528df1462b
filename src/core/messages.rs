//! Localized message catalog.
//!
//! Every text the bot sends is rendered here, in English or French depending on the
//! `language` setting. The texts live in Fluent resources under `locales/`, one
//! bundle per language; functions take already-computed values and only format them.

use crate::{
    core::{aggregate::MonthTotal, alerts::Alert},
    entities::{Language, Settings, Weather},
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use fluent::{FluentArgs, FluentResource};
use fluent_bundle::bundle::FluentBundle;
use intl_memoizer::concurrent::IntlLangMemoizer;
use std::sync::LazyLock;
use tracing::{error, warn};
use unic_langid::LanguageIdentifier;

type Bundle = FluentBundle<FluentResource, IntlLangMemoizer>;

/// Every message id the resources must define.
pub const MESSAGE_IDS: &[&str] = &[
    "alert-liveness",
    "alert-overheat",
    "alert-recovery",
    "alert-recovery-after",
    "alert-outage",
    "alert-urgent-outage",
    "alert-best-day",
    "alert-milestone",
    "alert-cleaning-reminder",
    "error-generic",
    "error-invalid-command",
    "error-not-authorized",
    "help-title",
    "help-status",
    "help-today",
    "help-total",
    "help-money-today",
    "help-money-total",
    "help-cleaning",
    "help-compare",
    "help-weather",
    "help-history",
    "help-help",
    "help-set-language",
    "help-set-cost",
    "help-set-cleaning",
    "help-set-temp",
    "status-state",
    "status-power",
    "status-today",
    "status-temperature",
    "status-last-update",
    "energy-today",
    "energy-lifetime",
    "money-today",
    "money-lifetime",
    "cleaning-last",
    "cleaning-never",
    "comparison",
    "weather",
    "history-empty",
    "history-title",
    "history-total",
    "report-weekly",
    "report-monthly",
    "setting-language",
    "setting-cost",
    "setting-cleaning",
    "setting-temp",
    "date-format",
    "month",
];

struct Catalog {
    en: Bundle,
    fr: Bundle,
}

static CATALOG: LazyLock<Catalog> = LazyLock::new(|| Catalog {
    en: load_bundle(Language::En),
    fr: load_bundle(Language::Fr),
});

impl Catalog {
    const fn bundle(&self, language: Language) -> &Bundle {
        match language {
            Language::En => &self.en,
            Language::Fr => &self.fr,
        }
    }
}

const fn resource_source(language: Language) -> &'static str {
    match language {
        Language::En => include_str!("../../locales/en/messages.ftl"),
        Language::Fr => include_str!("../../locales/fr/messages.ftl"),
    }
}

fn load_bundle(language: Language) -> Bundle {
    let resource = FluentResource::try_new(resource_source(language).to_string()).unwrap_or_else(
        |(partial, errors)| {
            error!("Failed to parse {} messages: {:?}", language, errors);
            partial
        },
    );
    let lang_id: LanguageIdentifier = language.to_string().parse().unwrap_or_default();

    let mut bundle = Bundle::new_concurrent(vec![lang_id]);
    // no bidi isolation marks around arguments, Discord renders them literally
    bundle.set_use_isolating(false);
    if let Err(errors) = bundle.add_resource(resource) {
        error!("Failed to add {} messages: {:?}", language, errors);
    }
    bundle
}

/// Formats message `id` in `language`, or returns the id when the message is missing.
fn render(language: Language, id: &str, args: Option<&FluentArgs<'_>>) -> String {
    let bundle = CATALOG.bundle(language);
    let Some(pattern) = bundle.get_message(id).and_then(|message| message.value()) else {
        error!("Message {} missing for language {}", id, language);
        return id.to_string();
    };

    let mut errors = vec![];
    let text = bundle.format_pattern(pattern, args, &mut errors);
    if !errors.is_empty() {
        warn!("Errors formatting message {}: {:?}", id, errors);
    }
    text.into_owned()
}

fn text(language: Language, id: &str) -> String {
    render(language, id, None)
}

fn text_with(language: Language, id: &str, args: &[(&'static str, String)]) -> String {
    let args: FluentArgs<'_> = args.iter().map(|(name, value)| (*name, value.as_str())).collect();
    render(language, id, Some(&args))
}

fn month_name(language: Language, month: u32) -> String {
    let mut args = FluentArgs::new();
    args.set("month", month);
    render(language, "month", Some(&args))
}

fn local_date(date: NaiveDate, language: Language) -> String {
    date.format(&text(language, "date-format")).to_string()
}

/// Formats a duration as `1h05`, or `12 min` under an hour.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{}h{:02}", minutes / 60, minutes % 60)
    }
}

/// Formats a money amount with the configured currency symbol.
#[must_use]
pub fn format_money(amount: f64, settings: &Settings) -> String {
    format!("{amount:.2} {}", settings.currency_symbol)
}

fn local_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%H:%M").to_string()
}

/// Renders an alert for the chat group.
#[must_use]
pub fn alert(alert: &Alert, settings: &Settings, tz: Tz) -> String {
    let lang = settings.language;
    match alert {
        Alert::Liveness { last_update } => text_with(
            lang,
            "alert-liveness",
            &[
                ("time", local_time(*last_update, tz)),
                ("date", local_date(last_update.with_timezone(&tz).date_naive(), lang)),
            ],
        ),
        Alert::Overheat {
            temperature_c,
            threshold_c,
        } => text_with(
            lang,
            "alert-overheat",
            &[
                ("temperature", format!("{temperature_c:.1}")),
                ("threshold", threshold_c.to_string()),
            ],
        ),
        Alert::Recovery { down_for: Some(d) } => text_with(
            lang,
            "alert-recovery-after",
            &[("duration", format_duration(*d))],
        ),
        Alert::Recovery { down_for: None } => text(lang, "alert-recovery"),
        Alert::Outage => text(lang, "alert-outage"),
        Alert::UrgentOutage { since } => {
            text_with(lang, "alert-urgent-outage", &[("time", local_time(*since, tz))])
        }
        Alert::BestDay {
            kwh, previous_kwh, ..
        } => text_with(
            lang,
            "alert-best-day",
            &[
                ("kwh", format!("{kwh:.2}")),
                ("previous", format!("{previous_kwh:.2}")),
            ],
        ),
        Alert::Milestone { kwh } => text_with(lang, "alert-milestone", &[("kwh", kwh.to_string())]),
        Alert::CleaningReminder { weeks } => {
            text_with(lang, "alert-cleaning-reminder", &[("weeks", weeks.to_string())])
        }
    }
}

/// Reply to any failure the user cannot act on.
#[must_use]
pub fn generic_error(lang: Language) -> String {
    text(lang, "error-generic")
}

/// Reply to a malformed command, pointing at `{prefix}help`.
#[must_use]
pub fn invalid_command(lang: Language, prefix: &str) -> String {
    text_with(lang, "error-invalid-command", &[("prefix", prefix.to_string())])
}

/// Reply to a non-admin trying to change settings.
#[must_use]
pub fn not_authorized(lang: Language) -> String {
    text(lang, "error-not-authorized")
}

/// Command list.
#[must_use]
pub fn help(lang: Language, prefix: &str) -> String {
    const ROWS: [(&str, &str); 14] = [
        ("status", "help-status"),
        ("today", "help-today"),
        ("total", "help-total"),
        ("money today", "help-money-today"),
        ("money total", "help-money-total"),
        ("cleaning", "help-cleaning"),
        ("compare", "help-compare"),
        ("weather", "help-weather"),
        ("history [year]", "help-history"),
        ("help", "help-help"),
        ("set language <en|fr>", "help-set-language"),
        ("set cost <price>", "help-set-cost"),
        ("set cleaning <weeks>", "help-set-cleaning"),
        ("set temp <°C>", "help-set-temp"),
    ];

    let mut lines = vec![text(lang, "help-title")];
    lines.extend(
        ROWS.iter()
            .map(|(command, id)| format!("• `{prefix}{command}` - {}", text(lang, id))),
    );
    lines.join("\n")
}

/// Values shown by the status command.
#[derive(Debug, Clone)]
pub struct StatusView {
    /// Total instantaneous output power (W)
    pub power_w: f64,
    /// Hottest device temperature
    pub temperature_c: Option<f64>,
    /// Stalest device update
    pub last_update: Option<DateTime<Utc>>,
    /// Energy produced today (kWh)
    pub energy_today_kwh: f64,
    /// Whether an outage is currently tracked
    pub is_down: bool,
}

/// Status command reply.
#[must_use]
pub fn status(view: &StatusView, lang: Language, tz: Tz) -> String {
    let state = if view.power_w > 0.0 {
        "producing"
    } else if view.is_down {
        "outage"
    } else {
        "idle"
    };

    let mut lines = vec![
        text_with(lang, "status-state", &[("state", state.to_string())]),
        text_with(lang, "status-power", &[("power", format!("{:.0}", view.power_w))]),
        text_with(lang, "status-today", &[("kwh", format!("{:.2}", view.energy_today_kwh))]),
    ];
    if let Some(t) = view.temperature_c {
        lines.push(text_with(lang, "status-temperature", &[("temperature", format!("{t:.1}"))]));
    }
    if let Some(at) = view.last_update {
        lines.push(text_with(lang, "status-last-update", &[("time", local_time(at, tz))]));
    }
    lines.join("\n")
}

/// Energy produced today.
#[must_use]
pub fn energy_today(kwh: f64, lang: Language) -> String {
    text_with(lang, "energy-today", &[("kwh", format!("{kwh:.2}"))])
}

/// Lifetime production.
#[must_use]
pub fn energy_lifetime(kwh: f64, lang: Language) -> String {
    text_with(lang, "energy-lifetime", &[("kwh", format!("{kwh:.0}"))])
}

/// Value of today's production.
#[must_use]
pub fn money_today(kwh: f64, settings: &Settings) -> String {
    text_with(
        settings.language,
        "money-today",
        &[
            ("amount", format_money(kwh * settings.cost_per_kwh, settings)),
            ("kwh", format!("{kwh:.2}")),
        ],
    )
}

/// Value of the lifetime production.
#[must_use]
pub fn money_lifetime(kwh: f64, settings: &Settings) -> String {
    text_with(
        settings.language,
        "money-lifetime",
        &[
            ("amount", format_money(kwh * settings.cost_per_kwh, settings)),
            ("kwh", format!("{kwh:.0}")),
        ],
    )
}

/// Cleaning schedule. `last` is `None` when no reminder was ever sent.
#[must_use]
pub fn cleaning_status(last: Option<NaiveDate>, next_due: NaiveDate, weeks: u32, lang: Language) -> String {
    match last {
        Some(last) => text_with(
            lang,
            "cleaning-last",
            &[
                ("last", local_date(last, lang)),
                ("next", local_date(next_due, lang)),
                ("weeks", weeks.to_string()),
            ],
        ),
        None => text_with(lang, "cleaning-never", &[("weeks", weeks.to_string())]),
    }
}

/// Today compared to yesterday.
#[must_use]
pub fn comparison(today_kwh: f64, yesterday_kwh: f64, lang: Language) -> String {
    let delta = today_kwh - yesterday_kwh;
    let trend = if delta > 0.0 {
        "📈"
    } else if delta < 0.0 {
        "📉"
    } else {
        "➡️"
    };
    let percent = if yesterday_kwh > 0.0 {
        format!(" ({:+.1}%)", delta / yesterday_kwh * 100.0)
    } else {
        String::new()
    };
    text_with(
        lang,
        "comparison",
        &[
            ("trend", trend.to_string()),
            ("today", format!("{today_kwh:.2}")),
            ("yesterday", format!("{yesterday_kwh:.2}")),
            ("delta", format!("{delta:+.2}")),
            ("percent", percent),
        ],
    )
}

/// Weather at the plant.
#[must_use]
pub fn weather(weather: &Weather, lang: Language) -> String {
    text_with(
        lang,
        "weather",
        &[
            ("condition", weather.condition.clone()),
            ("temperature", format!("{:.1}", weather.temperature_c)),
        ],
    )
}

/// Monthly production of a year.
#[must_use]
pub fn history(year: i32, months: &[MonthTotal], lang: Language) -> String {
    let year_arg = [("year", year.to_string())];
    if months.is_empty() {
        return text_with(lang, "history-empty", &year_arg);
    }

    let mut lines = vec![text_with(lang, "history-title", &year_arg)];
    lines.extend(
        months
            .iter()
            .map(|m| format!("{}: {:.2} kWh", month_name(lang, m.month), m.kwh)),
    );
    let total: f64 = months.iter().map(|m| m.kwh).sum();
    lines.push(text_with(lang, "history-total", &[("kwh", format!("{total:.2}"))]));
    lines.join("\n")
}

/// Weekly production report, `week_start` being the Monday.
#[must_use]
pub fn weekly_report(week_start: NaiveDate, kwh: f64, settings: &Settings) -> String {
    let lang = settings.language;
    text_with(
        lang,
        "report-weekly",
        &[
            ("week", local_date(week_start, lang)),
            ("kwh", format!("{kwh:.2}")),
            ("amount", format_money(kwh * settings.cost_per_kwh, settings)),
        ],
    )
}

/// Monthly production report.
#[must_use]
pub fn monthly_report(month_start: NaiveDate, kwh: f64, settings: &Settings) -> String {
    let lang = settings.language;
    text_with(
        lang,
        "report-monthly",
        &[
            ("month", month_name(lang, month_start.month())),
            ("year", month_start.year().to_string()),
            ("kwh", format!("{kwh:.2}")),
            ("amount", format_money(kwh * settings.cost_per_kwh, settings)),
        ],
    )
}

/// Confirmation of a settings change, rendered in the (possibly new) language.
#[must_use]
pub fn setting_updated(settings: &Settings, change: SettingChange) -> String {
    let lang = settings.language;
    match change {
        SettingChange::Language => text(lang, "setting-language"),
        SettingChange::Cost => text_with(
            lang,
            "setting-cost",
            &[("amount", format_money(settings.cost_per_kwh, settings))],
        ),
        SettingChange::CleaningInterval => text_with(
            lang,
            "setting-cleaning",
            &[("weeks", settings.cleaning_interval_weeks.to_string())],
        ),
        SettingChange::TempThreshold => text_with(
            lang,
            "setting-temp",
            &[("threshold", settings.temp_threshold.to_string())],
        ),
    }
}

/// Which setting a confirmation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    /// `set language`
    Language,
    /// `set cost`
    Cost,
    /// `set cleaning`
    CleaningInterval,
    /// `set temp`
    TempThreshold,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::minutes(12)), "12 min");
        assert_eq!(format_duration(Duration::minutes(65)), "1h05");
        assert_eq!(format_duration(Duration::hours(3)), "3h00");
        assert_eq!(format_duration(Duration::minutes(-5)), "0 min");
    }

    #[test]
    fn test_alert_follows_language() {
        let mut settings = Settings::default();
        let text = alert(&Alert::Milestone { kwh: 2000 }, &settings, chrono_tz::UTC);
        assert!(text.contains("2000 kWh"));
        assert!(text.contains("Milestone"));

        settings.language = Language::Fr;
        let text = alert(&Alert::Milestone { kwh: 2000 }, &settings, chrono_tz::UTC);
        assert!(text.contains("Cap franchi"));
    }

    #[test]
    fn test_money_uses_cost_and_symbol() {
        let settings = Settings {
            cost_per_kwh: 0.25,
            currency_symbol: "CHF".to_string(),
            ..Settings::default()
        };
        assert!(money_today(10.0, &settings).contains("2.50 CHF"));
    }

    #[test]
    fn test_history_lists_months_and_total() {
        let months = [
            MonthTotal { month: 3, kwh: 10.0 },
            MonthTotal { month: 11, kwh: 7.5 },
        ];
        let text = history(2023, &months, Language::Fr);
        assert!(text.contains("mars: 10.00 kWh"));
        assert!(text.contains("novembre: 7.50 kWh"));
        assert!(text.contains("17.50 kWh"));

        assert!(history(2023, &[], Language::En).contains("No production"));
    }

    #[test]
    fn test_comparison_percentage() {
        let text = comparison(12.0, 10.0, Language::En);
        assert!(text.contains("+2.00 kWh"));
        assert!(text.contains("+20.0%"));
        assert!(!comparison(5.0, 0.0, Language::En).contains('%'));
    }

    #[test]
    fn test_help_uses_prefix() {
        let text = help(Language::En, "!");
        assert!(text.starts_with("**Available commands**\n"));
        assert!(text.contains("`!status` - current production and inverter state"));
        assert!(text.contains("`!set temp <°C>`"));
        assert_eq!(text.lines().count(), 15);
    }

    #[test]
    fn test_every_message_exists_in_both_languages() {
        for language in [Language::En, Language::Fr] {
            let bundle = CATALOG.bundle(language);
            for id in MESSAGE_IDS {
                assert!(
                    bundle.get_message(id).and_then(|m| m.value()).is_some(),
                    "{id} missing for {language}"
                );
            }
        }
    }

    #[test]
    fn test_arguments_are_not_isolated() {
        let text = energy_today(3.5, Language::En);
        assert_eq!(text, "☀️ Produced today: 3.50 kWh");
        assert!(!text.contains('\u{2068}'));
    }

    #[test]
    fn test_invalid_command_mentions_prefixed_help() {
        assert!(invalid_command(Language::En, "!").contains("`!help`"));
        assert!(invalid_command(Language::Fr, "?").contains("`?help`"));
    }

    #[test]
    fn test_status_state_selection() {
        let view = StatusView {
            power_w: 0.0,
            temperature_c: Some(41.26),
            last_update: None,
            energy_today_kwh: 2.0,
            is_down: true,
        };
        let text = status(&view, Language::Fr, chrono_tz::UTC);
        assert!(text.starts_with("**État de l'installation :** 🔴 en panne"));
        assert!(text.contains("**Température :** 41.3°C"));
        assert!(!text.contains("mise à jour"));

        let producing = StatusView {
            power_w: 1520.4,
            is_down: false,
            ..view
        };
        let text = status(&producing, Language::En, chrono_tz::UTC);
        assert!(text.contains("🟢 producing"));
        assert!(text.contains("**Power:** 1520 W"));
    }

    #[test]
    fn test_dates_follow_language() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 27).unwrap_or_default();
        let mut settings = Settings::default();
        assert!(weekly_report(monday, 21.0, &settings).contains("week of 2024-05-27"));

        settings.language = Language::Fr;
        assert!(weekly_report(monday, 21.0, &settings).contains("semaine du 27/05/2024"));
        assert!(monthly_report(monday, 15.0, &settings).contains("Bilan de mai 2024"));
    }
}
