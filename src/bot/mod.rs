//! Bot layer - Discord-specific interface, message handling and bot context
//!
//! This module wires the framework-agnostic [`Monitor`] into Discord: chat
//! messages in the notification channel are routed to the command dispatcher,
//! and scheduler output is posted back to the same channel.

/// Discord slash commands (help)
pub mod commands;
/// Discord event handlers (plain-text chat commands)
pub mod handlers;
/// Channel-backed notifier used by the scheduler
pub mod notifier;

use crate::{
    config::{AdminList, AppConfig},
    core::{monitor::Monitor, notify::Notifier, scheduler},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, instrument};

pub use notifier::ChannelNotifier;

/// Shared data available to all bot commands and event handlers.
pub struct BotData {
    /// Monitoring service shared with the scheduler
    pub monitor: Arc<Monitor>,
    /// Users allowed to change settings
    pub admins: AdminList,
    /// Prefix of plain-text commands
    pub prefix: String,
    /// The group channel the bot listens and posts to
    pub channel_id: serenity::ChannelId,
}

impl BotData {
    /// Creates the bot context from the loaded configuration.
    #[must_use]
    pub fn new(monitor: Arc<Monitor>, admins: AdminList, config: &AppConfig) -> Self {
        Self {
            monitor,
            admins,
            prefix: config.command_prefix.clone(),
            channel_id: serenity::ChannelId::new(config.notification_channel_id),
        }
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        poise::FrameworkError::EventHandler { error, .. } => {
            error!("Error while handling event: {}", error);
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Slash commands registered with Discord.
#[must_use]
pub fn slash_commands() -> Vec<poise::Command<BotData, Error>> {
    vec![commands::help()]
}

/// Only guild channel messages are read; direct messages are never handled.
#[must_use]
pub fn gateway_intents() -> serenity::GatewayIntents {
    serenity::GatewayIntents::GUILD_MESSAGES | serenity::GatewayIntents::MESSAGE_CONTENT
}

/// Connects to Discord and runs until the client stops.
///
/// The scheduled jobs are started once the bot is logged in, so their
/// messages always have a live HTTP client to go through.
#[instrument(skip_all)]
pub async fn run_bot(token: String, config: AppConfig, data: BotData) -> Result<()> {
    let schedule = config.schedule.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: slash_commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let notifier: Arc<dyn Notifier> =
                    Arc::new(ChannelNotifier::new(Arc::clone(&ctx.http), data.channel_id));
                let jobs = scheduler::spawn_scheduler(&data.monitor, &notifier, &schedule)?;
                info!("{} scheduled jobs running", jobs.len());

                Ok(data)
            })
        })
        .build();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, gateway_intents())
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}
