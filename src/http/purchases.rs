//! Purchase route.

use super::{AppState, error::body};
use crate::{
    core::purchase,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseBody {
    user_id: Option<i64>,
    #[serde(default)]
    product_ids: Vec<i64>,
}

pub async fn purchase(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PurchaseBody>, JsonRejection>,
) -> Result<Response> {
    let input = body(payload)?;
    let user_id = input
        .user_id
        .ok_or_else(|| Error::validation("userId is required"))?;

    let receipt = purchase::purchase(&state.db, user_id, &input.product_ids).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Purchase completed",
        "purchase": receipt,
    }))
    .into_response())
}
