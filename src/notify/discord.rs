//! Discord delivery for notifications.
//!
//! Uses a standalone serenity HTTP client, so notifications keep flowing even
//! while the gateway connection of the bot is reconnecting.

use super::Notifier;
use crate::errors::{Error, Result};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Sends notifications as Discord channel messages.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
}

impl DiscordNotifier {
    /// Creates a notifier authenticated with the bot token.
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(serenity::Http::new(token)),
        }
    }
}

/// Parses a channel handle into a Discord channel id.
pub(crate) fn parse_channel_id(channel: &str) -> Result<serenity::ChannelId> {
    let raw: u64 = channel.trim().parse().map_err(|e| Error::Notification {
        message: format!("Invalid Discord channel id '{channel}': {e}"),
    })?;
    if raw == 0 {
        return Err(Error::Notification {
            message: "Discord channel id cannot be zero".to_string(),
        });
    }
    Ok(serenity::ChannelId::new(raw))
}

impl Notifier for DiscordNotifier {
    async fn send(&self, channel: &str, text: &str) -> Result<()> {
        let channel_id = parse_channel_id(channel)?;
        channel_id.say(&*self.http, text).await?;
        Ok(())
    }
}
