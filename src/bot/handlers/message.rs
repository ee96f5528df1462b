//! Routes messages from the group channel to the command dispatcher.

use crate::{
    bot::BotData,
    core::commands::{Caller, handle_message},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tracing::debug;

/// Whether a message should be looked at at all.
///
/// Only human messages in the configured channel are handled.
#[must_use]
pub fn is_listening(author_is_bot: bool, channel: serenity::ChannelId, configured: serenity::ChannelId) -> bool {
    !author_is_bot && channel == configured
}

/// Framework event hook.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    if let serenity::FullEvent::Message { new_message } = event {
        on_message(ctx, new_message, data).await?;
    }
    Ok(())
}

async fn on_message(ctx: &serenity::Context, message: &serenity::Message, data: &BotData) -> Result<()> {
    if !is_listening(message.author.bot, message.channel_id, data.channel_id) {
        return Ok(());
    }

    let caller = Caller {
        user_id: message.author.id.to_string(),
        is_admin: data.admins.is_admin(message.author.id.get()),
    };
    if let Some(reply) = handle_message(&data.monitor, &message.content, &data.prefix, &caller).await {
        debug!("Replying to {} in channel {}", caller.user_id, message.channel_id);
        message.channel_id.say(&ctx.http, reply).await?;
    }
    Ok(())
}
