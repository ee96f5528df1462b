//! Delivers scheduler output to the group channel.

use crate::core::notify::Notifier;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info};

/// [`Notifier`] posting to one Discord channel.
pub struct ChannelNotifier {
    http: Arc<serenity::Http>,
    channel: serenity::ChannelId,
}

impl ChannelNotifier {
    /// Creates a notifier for `channel`.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>, channel: serenity::ChannelId) -> Self {
        Self { http, channel }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, text: &str) {
        match self.channel.say(&self.http, text).await {
            Ok(_) => info!("Notification sent to channel {}", self.channel),
            Err(e) => error!("Failed to send notification to {}: {}", self.channel, e),
        }
    }
}
