//! General Discord commands - help.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::messages,
        errors::{Error, Result},
    };

    /// Lists the text commands understood in the group channel.
    #[poise::command(slash_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let language = data.monitor.settings().await.language;
        ctx.say(messages::help(language, &data.prefix)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
