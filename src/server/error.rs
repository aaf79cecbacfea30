use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::repository::BackendError;
use crate::services::error_handling::{LogHelper, RsvpError, UserErrorFormatter};
use crate::services::rate_limiter::RateLimitExceeded;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Rsvp(#[from] RsvpError),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Rsvp(RsvpError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid data",
                    "details": errors.messages(),
                    "fields": errors,
                })),
            )
                .into_response(),
            ApiError::Rsvp(err) => {
                LogHelper::log_error_with_context("api", &err);
                let (status, label) = match &err {
                    RsvpError::Mutation {
                        source: BackendError::NotFound(_),
                        ..
                    } => (StatusCode::NOT_FOUND, "Not found"),
                    RsvpError::Backend(_)
                    | RsvpError::BackendUnavailable(_)
                    | RsvpError::Mutation { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
                    }
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
                };
                (
                    status,
                    Json(json!({
                        "error": label,
                        "details": UserErrorFormatter::format_for_ui(&err),
                    })),
                )
                    .into_response()
            }
            ApiError::MalformedPayload(reason) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid data", "details": [reason] })),
            )
                .into_response(),
            ApiError::RateLimited(limit) => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": limit.to_string() })),
                )
                    .into_response();
                let seconds = limit.retry_after.as_secs().max(1);
                if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                    response.headers_mut().insert(RETRY_AFTER, value);
                }
                response
            }
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
            }
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({ "error": "Method not allowed" })),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error", "details": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
