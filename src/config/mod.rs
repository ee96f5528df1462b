/// Application configuration loading from config.toml
pub mod app;

/// Admin user list from environment variables
pub mod admins;

/// JSON state file holding settings, stats and outage status
pub mod store;

pub use admins::AdminList;
pub use app::{ApiConfig, AppConfig, MonitoringConfig, ScheduleConfig, load_config, load_default_config, parse_schedule};
pub use store::StateStore;
