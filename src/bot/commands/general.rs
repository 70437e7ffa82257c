//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Charity Hub Help**\n\
        Here is a summary of all available commands.\n\n\
        **Everyone**\n\
        • `/fund` - Shows how much money the charity fund holds and what is waiting.\n\
        • `/link <user_id>` - Sends your charity-hub notifications to your Discord DMs.\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.\n\n\
        **Admins**\n\
        • `/requests [status]` - Lists help requests, pending ones by default.\n\
        • `/approve <id>` - Approves a pending request and pays it out of the fund.\n\
        • `/reject <id> [reason]` - Rejects a pending request.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
