//! Help request Discord commands - the admin review queue.
//!
//! Only Discord ids listed as admins in the settings may use these commands.
//! Decisions go through the same core workflow as the HTTP API, so the fund
//! can never be overdrawn from either side.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete},
        core::help_request::{self, Decision},
        entities::{HelpStatus, help_request::Model as HelpRequestModel},
        errors::{Error, Result},
        notify::format_amount,
    };
    use poise::serenity_prelude as serenity;
    use tracing::warn;

    /// Discord embeds hold at most 25 fields.
    const MAX_LISTED: usize = 25;

    /// One embed field describing a request.
    pub(crate) fn request_field(request: &HelpRequestModel) -> (String, String, bool) {
        let name = format!(
            "#{} · {} · {}",
            request.id,
            request.user_name,
            format_amount(request.amount)
        );
        let mut value = format!("**Status:** {}\n**Reason:** {}", request.status, request.reason);
        if let Some(phone) = &request.phone {
            value.push_str(&format!("\n**Phone:** {phone}"));
        }
        if let Some(handle) = &request.contact_handle {
            value.push_str(&format!("\n**Contact:** {handle}"));
        }
        if let Some(reason) = &request.rejection_reason {
            value.push_str(&format!("\n**Rejected:** {reason}"));
        }
        (name, value, false)
    }

    /// Replies with a refusal and returns false when the caller is not an admin.
    async fn ensure_admin(ctx: poise::Context<'_, BotData, Error>) -> Result<bool> {
        let caller = ctx.author().id.to_string();
        if ctx.data().settings.is_admin(&caller) {
            return Ok(true);
        }
        warn!("Non-admin {} tried to use /{}", caller, ctx.command().name);
        ctx.say("❌ Only fund administrators can do that.").await?;
        Ok(false)
    }

    /// Lists help requests, pending ones unless a status is given.
    #[poise::command(slash_command, prefix_command)]
    pub async fn requests(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Status to show (defaults to pending)"]
        #[autocomplete = "autocomplete::autocomplete_status"]
        status: Option<String>,
    ) -> Result<()> {
        if !ensure_admin(ctx).await? {
            return Ok(());
        }

        let status = match status {
            Some(raw) => match raw.parse::<HelpStatus>() {
                Ok(status) => status,
                Err(e) => {
                    ctx.say(format!("❌ {e}")).await?;
                    return Ok(());
                }
            },
            None => HelpStatus::Pending,
        };

        let requests =
            help_request::list_help_requests(&ctx.data().database, Some(status)).await?;
        if requests.is_empty() {
            ctx.say(format!("📭 No {status} help requests.")).await?;
            return Ok(());
        }

        let total = requests.len();
        let fields: Vec<_> = requests.iter().take(MAX_LISTED).map(request_field).collect();
        let mut embed = serenity::CreateEmbed::default()
            .title(format!("🆘 Help requests ({status})"))
            .color(0x00E6_7E22) // Orange
            .fields(fields);
        if total > MAX_LISTED {
            embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
                "Showing {MAX_LISTED} of {total}"
            )));
        }

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Approves a pending help request and pays it out of the fund.
    #[poise::command(slash_command, prefix_command)]
    pub async fn approve(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Help request id"] id: i64,
    ) -> Result<()> {
        if !ensure_admin(ctx).await? {
            return Ok(());
        }
        let data = ctx.data();

        let outcome = help_request::decide_help_request(
            &data.database,
            &data.events,
            id,
            Decision::Approve,
            Some(ctx.author().name.clone()),
            None,
        )
        .await;

        match outcome {
            Ok(request) => {
                ctx.say(format!(
                    "✅ Request #{} approved: {} credited to {}.",
                    request.id,
                    format_amount(request.amount),
                    request.user_name
                ))
                .await?;
            }
            Err(Error::InsufficientFunds {
                available,
                required,
            }) => {
                ctx.say(format!(
                    "⚠️ Not enough in the fund: {} available, {} needed. The request stays pending.",
                    format_amount(available),
                    format_amount(required)
                ))
                .await?;
            }
            Err(e @ (Error::Conflict { .. } | Error::HelpRequestNotFound { .. })) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Rejects a pending help request.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reject(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Help request id"] id: i64,
        #[description = "Why the request is rejected"]
        #[rest]
        reason: Option<String>,
    ) -> Result<()> {
        if !ensure_admin(ctx).await? {
            return Ok(());
        }
        let data = ctx.data();

        let outcome = help_request::decide_help_request(
            &data.database,
            &data.events,
            id,
            Decision::Reject,
            Some(ctx.author().name.clone()),
            reason,
        )
        .await;

        match outcome {
            Ok(request) => {
                ctx.say(format!(
                    "🚫 Request #{} rejected. Reason: {}",
                    request.id,
                    request
                        .rejection_reason
                        .as_deref()
                        .unwrap_or(help_request::DEFAULT_REJECTION_REASON)
                ))
                .await?;
            }
            Err(e @ (Error::Conflict { .. } | Error::HelpRequestNotFound { .. })) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

#[cfg(test)]
mod tests {
    use super::inner::request_field;
    use crate::entities::{HelpStatus, help_request};
    use chrono::Utc;

    #[test]
    fn test_request_field() {
        let request = help_request::Model {
            id: 12,
            user_id: 3,
            user_name: "Maria".to_string(),
            user_email: "maria@example.com".to_string(),
            phone: None,
            contact_handle: Some("@maria".to_string()),
            reason: "Rent".to_string(),
            amount: 12_500,
            status: HelpStatus::Rejected,
            approved_by: None,
            approved_at: None,
            completed_at: None,
            rejection_reason: Some("Duplicate".to_string()),
            active_slot: None,
            created_at: Utc::now(),
        };

        let (name, value, inline) = request_field(&request);
        assert_eq!(name, "#12 · Maria · 12,500");
        assert!(value.contains("**Status:** rejected"));
        assert!(value.contains("**Contact:** @maria"));
        assert!(value.contains("**Rejected:** Duplicate"));
        assert!(!value.contains("Phone"));
        assert!(!inline);
    }
}
