use solar_buddy::{
    api::VendorClient,
    bot::{self, BotData},
    config::{self, AdminList, StateStore},
    core::{clock::SystemClock, monitor::Monitor},
    errors::{Error, Result},
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load and validate config.toml
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    let tz = app_config.tz()?;
    info!("Configuration loaded (timezone {})", tz);

    let admins = AdminList::from_env();
    if admins.is_empty() {
        warn!("ADMIN_USER_IDS is empty; nobody can change settings");
    }

    // 4. Telemetry source and monitoring service
    let source = VendorClient::from_env(&app_config.api)?;
    let monitor = Monitor::new(
        Arc::new(source),
        Arc::new(SystemClock),
        StateStore::new(&app_config.state_file),
        tz,
        app_config.monitoring.clone(),
    )
    .inspect(|_| info!("State loaded from {}", app_config.state_file.display()))
    .inspect_err(|e| error!("Failed to load state: {}", e))?;

    // 5. Run the bot; the token is read directly before use, not stored in config
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    let data = BotData::new(Arc::new(monitor), admins, &app_config);
    bot::run_bot(token, app_config, data).await
}
