//! Catalog routes: products, comments, and the top-rated listing.

use super::{AppState, error::body};
use crate::{
    core::{
        catalog::{self, NewComment, NewProduct},
        user,
    },
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    name: Option<String>,
    price: Option<i64>,
    category: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    user_id: Option<i64>,
    user_name: Option<String>,
    #[serde(default)]
    text: String,
    rating: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    limit: Option<u64>,
}

pub async fn list_products(State(state): State<AppState>) -> Result<Response> {
    let products = catalog::list_products(&state.db).await?;
    Ok(Json(json!({ "success": true, "count": products.len(), "products": products })).into_response())
}

pub async fn create_product(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateProduct>, JsonRejection>,
) -> Result<Response> {
    let input = body(payload)?;
    let product = catalog::create_product(
        &state.db,
        NewProduct {
            name: input
                .name
                .ok_or_else(|| Error::validation("name is required"))?,
            price: input
                .price
                .ok_or_else(|| Error::validation("price is required"))?,
            category: input.category,
            description: input.description,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Product created", "product": product })),
    )
        .into_response())
}

pub async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let product = catalog::require_product(&state.db, id).await?;
    let comments = catalog::comments_for_product(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "product": product, "comments": comments })).into_response())
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<CreateComment>, JsonRejection>,
) -> Result<Response> {
    let input = body(payload)?;

    // Fall back to the author's account name when the client sent only an id
    let user_name = match (input.user_name, input.user_id) {
        (Some(name), _) if !name.trim().is_empty() => name,
        (_, Some(user_id)) => user::require_user(&state.db, user_id).await?.name,
        _ => "Anonymous".to_string(),
    };

    let product = catalog::add_comment(
        &state.db,
        id,
        NewComment {
            user_id: input.user_id,
            user_name,
            text: input.text,
            rating: input.rating,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Comment added", "product": product })),
    )
        .into_response())
}

pub async fn top_rated(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<Response> {
    let products = catalog::top_rated(&state.db, query.limit).await?;
    Ok(Json(json!({ "success": true, "count": products.len(), "products": products })).into_response())
}
