//! Fund Discord commands - shows the state of the charitable fund.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::ledger::{self, FundSummary},
        errors::{Error, Result},
        notify::format_amount,
    };
    use poise::serenity_prelude as serenity;

    /// Embed fields for a fund summary, in display order.
    pub(crate) fn summary_fields(summary: &FundSummary) -> Vec<(String, String, bool)> {
        vec![
            (
                "💰 Available".to_string(),
                format_amount(summary.available),
                true,
            ),
            (
                "💚 Donated".to_string(),
                format_amount(summary.total_donated),
                true,
            ),
            (
                "🤝 Disbursed".to_string(),
                format_amount(summary.total_disbursed),
                true,
            ),
            (
                "⏳ Pending requests".to_string(),
                format!(
                    "{} totalling {}",
                    summary.pending_requests,
                    format_amount(summary.pending_amount)
                ),
                false,
            ),
        ]
    }

    /// Shows the fund balance and the backlog of pending help requests.
    #[poise::command(slash_command, prefix_command)]
    pub async fn fund(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let summary = ledger::fund_summary(&ctx.data().database).await?;

        let embed = serenity::CreateEmbed::default()
            .title("🏦 Charity Fund")
            .color(0x002E_CC71) // Green
            .fields(summary_fields(&summary));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
