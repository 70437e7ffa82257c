//! User routes: accounts, notification channels, and per-user listings.

use super::{AppState, error::body};
use crate::{
    core::{catalog, donation, help_request, user},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    name: Option<String>,
    email: Option<String>,
    #[serde(default)]
    balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct LinkChannel {
    channel: Option<String>,
}

pub async fn list_users(State(state): State<AppState>) -> Result<Response> {
    let users = user::list_users(&state.db).await?;
    Ok(Json(json!({ "success": true, "count": users.len(), "users": users })).into_response())
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUser>, JsonRejection>,
) -> Result<Response> {
    let input = body(payload)?;
    let name = input
        .name
        .ok_or_else(|| Error::validation("name is required"))?;
    let email = input
        .email
        .ok_or_else(|| Error::validation("email is required"))?;

    let created = user::create_user(&state.db, name, email, input.balance).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "User created", "user": created })),
    )
        .into_response())
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let found = user::require_user(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "user": found })).into_response())
}

pub async fn link_notifications(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<LinkChannel>, JsonRejection>,
) -> Result<Response> {
    let input = body(payload)?;
    let channel = input
        .channel
        .ok_or_else(|| Error::validation("channel is required"))?;

    let updated = user::link_notification_channel(&state.db, id, channel).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Notification channel linked",
        "user": updated,
    }))
    .into_response())
}

pub async fn purchase_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let history = user::purchase_history(&state.db, id).await?;
    Ok(Json(json!({
        "success": true,
        "userName": history.user_name,
        "currentBalance": history.current_balance,
        "purchaseHistory": history.purchase_history,
    }))
    .into_response())
}

pub async fn reviews(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    user::require_user(&state.db, id).await?;
    let reviews = catalog::comments_by_user(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "count": reviews.len(), "reviews": reviews })).into_response())
}

pub async fn donations(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let donations = donation::donations_for_user(&state.db, id).await?;
    let total: i64 = donations.iter().map(|d| d.amount).sum();
    Ok(Json(json!({
        "success": true,
        "count": donations.len(),
        "totalAmount": total,
        "donations": donations,
    }))
    .into_response())
}

pub async fn help_requests(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let requests = help_request::help_requests_for_user(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "count": requests.len(), "requests": requests })).into_response())
}
