//! Account Discord commands - connects a Discord account to a charity-hub user.
//!
//! Linking stores the caller's DM channel on the user, so approvals,
//! rejections, and donation receipts reach them privately.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::user,
        errors::{Error, Result},
    };
    use tracing::{info, warn};

    /// Sends your charity-hub notifications to your Discord DMs.
    #[poise::command(slash_command, prefix_command, ephemeral)]
    pub async fn link(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Your charity-hub user id"] user_id: i64,
    ) -> Result<()> {
        let dm = ctx.author().create_dm_channel(ctx).await?;

        match user::link_notification_channel(&ctx.data().database, user_id, dm.id.to_string())
            .await
        {
            Ok(linked) => {
                info!(
                    "Discord user {} linked to charity-hub user {}",
                    ctx.author().id,
                    linked.id
                );
                ctx.say(format!(
                    "✅ Linked! Notifications for **{}** will arrive in your DMs.",
                    linked.name
                ))
                .await?;
            }
            Err(Error::UserNotFound { id }) => {
                ctx.say(format!("❌ No charity-hub user with id {id}."))
                    .await?;
            }
            Err(Error::Conflict { .. }) => {
                warn!(
                    "Discord user {} tried to relink charity-hub user {}",
                    ctx.author().id,
                    user_id
                );
                ctx.say("❌ That account is already linked to another Discord user.")
                    .await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
