//! Notification sink used by the scheduled jobs.

use async_trait::async_trait;

/// Best-effort delivery of a text message to the chat group.
///
/// Implementations log delivery failures and swallow them; callers never wait on
/// or react to the outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message.
    async fn send(&self, text: &str);
}
