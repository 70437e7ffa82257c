//! Maps service errors onto HTTP responses.
//!
//! Every error body has the shape `{success: false, message}`. An approval or
//! purchase the money cannot cover is an expected outcome, so it is answered
//! with `200` and the figures needed to show the shortfall.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::InsufficientFunds {
                available,
                required,
            } => (
                StatusCode::OK,
                json!({
                    "success": false,
                    "message": "Insufficient funds",
                    "required": required,
                    "available": available,
                    "shortage": required - available,
                }),
            ),
            Self::Validation { message } | Self::Conflict { message } => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            ),
            e if e.is_not_found() => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": e.to_string() }),
            ),
            e => {
                error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Unwraps a JSON body, turning a malformed payload into a validation error.
pub fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> crate::errors::Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}
