//! Autocomplete handlers for Discord slash command parameters.
//!
//! This module provides autocomplete functionality for command parameters like
//! help request statuses, suggesting valid options as the admin types.

use crate::{bot::BotData, entities::HelpStatus, errors::Error};
use sea_orm::Iterable;

/// Status names that start with (or contain) the partial input.
#[must_use]
pub fn matching_statuses(partial: &str) -> Vec<String> {
    let partial_lower = partial.trim().to_lowercase();
    HelpStatus::iter()
        .map(|status| status.as_str().to_string())
        .filter(|name| name.contains(&partial_lower))
        .collect()
}

/// Provides autocomplete suggestions for help request statuses.
pub async fn autocomplete_status(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching_statuses(partial)
}
