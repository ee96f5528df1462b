//! JSON state store for `SolarBuddy`.
//!
//! Settings, stats and outage status are kept in one JSON document. The file is read
//! once at startup and rewritten in full after every mutation. Writes go to a sibling
//! temporary file first and are then renamed over the real one, so a crash mid-write
//! leaves the previous state intact.

use crate::entities::PersistedState;
use crate::errors::Result;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Handle on the state file location.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store for the given file. Nothing is read until [`Self::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted state.
    ///
    /// A missing file yields all defaults; missing fields inside an existing file
    /// are filled with their defaults, and out-of-range settings are reset.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<PersistedState> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No state file found, starting from defaults");
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut state: PersistedState = serde_json::from_str(&contents)?;
        state.outage = state.outage.normalized();
        state.settings = state.settings.normalized();
        debug!("Loaded state: {:?}", state);
        Ok(state)
    }

    /// Writes the full state back to disk.
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("State written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::{Language, OutageStatus, Settings, Stats};
    use chrono::{DateTime, Utc};

    #[test]
    fn test_missing_file_yields_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = StateStore::new(dir.path().join("state.json"));

        assert_eq!(store.load()?, PersistedState::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_present_fields() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{
                "settings": { "costPerKwh": 0.27, "currencySymbol": "CHF" },
                "stats": { "nextMilestoneKwh": 5000 }
            }"#,
        )?;

        let state = StateStore::new(&path).load()?;
        assert_eq!(state.settings.cost_per_kwh, 0.27);
        assert_eq!(state.settings.currency_symbol, "CHF");
        assert_eq!(state.settings.language, Language::En);
        assert_eq!(state.settings.cleaning_interval_weeks, 4);
        assert_eq!(state.settings.temp_threshold, 60);
        assert_eq!(state.stats.next_milestone_kwh, 5000);
        assert_eq!(state.stats.last_reminder_date, DateTime::<Utc>::UNIX_EPOCH);
        assert!(state.stats.best_day.is_none());
        assert_eq!(state.outage, OutageStatus::default());
        Ok(())
    }

    #[test]
    fn test_out_of_range_settings_fall_back_to_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{
                "settings": {
                    "language": "fr",
                    "costPerKwh": -1,
                    "cleaningIntervalWeeks": 0,
                    "tempThreshold": 5
                }
            }"#,
        )?;

        let state = StateStore::new(&path).load()?;
        assert_eq!(state.settings.language, Language::Fr);
        assert_eq!(state.settings.cost_per_kwh, 0.20);
        assert_eq!(state.settings.cleaning_interval_weeks, 4);
        assert_eq!(state.settings.temp_threshold, 60);
        Ok(())
    }

    #[test]
    fn test_save_then_load_round_trip_creates_parent_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        let mut state = PersistedState {
            settings: Settings {
                language: Language::Fr,
                ..Settings::default()
            },
            stats: Stats::default(),
            outage: OutageStatus::default(),
        };
        state.outage.mark_down(Utc::now());
        store.save(&state)?;

        assert_eq!(store.load()?, state);
        assert!(!store.path().with_extension("json.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_corrupt_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json")?;

        assert!(matches!(
            StateStore::new(&path).load(),
            Err(crate::errors::Error::Json(_))
        ));
        Ok(())
    }
}
