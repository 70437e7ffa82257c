//! Donation routes.

use super::{AppState, error::body};
use crate::{
    core::donation::{self, NewDonation},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonateBody {
    user_id: Option<i64>,
    amount: Option<i64>,
    message: Option<String>,
    #[serde(default)]
    is_anonymous: bool,
}

pub async fn donate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DonateBody>, JsonRejection>,
) -> Result<Response> {
    let input = body(payload)?;
    let donor_id = input
        .user_id
        .ok_or_else(|| Error::validation("userId is required"))?;

    let receipt = donation::record_donation(
        &state.db,
        &state.events,
        NewDonation {
            donor_id,
            amount: input.amount,
            message: input.message,
            is_anonymous: input.is_anonymous,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Thank you for your donation",
            "donation": receipt.donation,
            "remainingBalance": receipt.remaining_balance,
            "totalDonated": receipt.total_donated,
        })),
    )
        .into_response())
}

pub async fn stats(State(state): State<AppState>) -> Result<Response> {
    let stats = donation::donation_stats(&state.db).await?;
    Ok(Json(json!({ "success": true, "stats": stats })).into_response())
}
