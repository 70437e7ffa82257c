//! Help request and fund routes.

use super::{AppState, error::body};
use crate::{
    core::{
        help_request::{self, Decision, NewHelpRequest},
        ledger,
    },
    entities::HelpStatus,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    user_id: Option<i64>,
    phone: Option<String>,
    contact_handle: Option<String>,
    reason: Option<String>,
    amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideBody {
    status: Option<String>,
    approved_by: Option<String>,
    rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    status: Option<String>,
}

pub async fn submit(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitBody>, JsonRejection>,
) -> Result<Response> {
    let input = body(payload)?;
    let user_id = input
        .user_id
        .ok_or_else(|| Error::validation("userId is required"))?;

    let request = help_request::submit_help_request(
        &state.db,
        &state.events,
        NewHelpRequest {
            user_id,
            phone: input.phone,
            contact_handle: input.contact_handle,
            reason: input.reason,
            amount: input.amount,
        },
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Help request submitted",
        "request": request,
    }))
    .into_response())
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Response> {
    let status = query
        .status
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<HelpStatus>())
        .transpose()?;

    let requests = help_request::list_help_requests(&state.db, status).await?;
    Ok(Json(json!({ "success": true, "count": requests.len(), "requests": requests })).into_response())
}

pub async fn decide(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<DecideBody>, JsonRejection>,
) -> Result<Response> {
    let input = body(payload)?;
    let decision: Decision = input
        .status
        .ok_or_else(|| Error::validation("status is required"))?
        .parse()?;

    let request = help_request::decide_help_request(
        &state.db,
        &state.events,
        id,
        decision,
        input.approved_by,
        input.rejection_reason,
    )
    .await?;

    let message = match decision {
        Decision::Approve => "Help request approved and paid out",
        Decision::Reject => "Help request rejected",
    };
    Ok(Json(json!({ "success": true, "message": message, "request": request })).into_response())
}

pub async fn fund(State(state): State<AppState>) -> Result<Response> {
    let summary = ledger::fund_summary(&state.db).await?;
    Ok(Json(json!({ "success": true, "fund": summary })).into_response())
}
