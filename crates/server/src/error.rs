//! Error-to-response mapping for the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use db::models::validation::ValidationError;
use serde_json::json;
use services::services::itinerary_generator::GeneratorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GeneratorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Validation failures echo the first failing field and message.
            Self::Validation(err) => (StatusCode::BAD_REQUEST, Json(err)).into_response(),
            Self::Unauthorized => {
                (StatusCode::UNAUTHORIZED, message_body("Unauthorized")).into_response()
            }
            Self::Forbidden => (StatusCode::FORBIDDEN, message_body("Forbidden")).into_response(),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                message_body(&format!("{} not found", capitalize(what))),
            )
                .into_response(),
            // Internal details are logged, never echoed to the caller.
            Self::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message_body("Internal server error"),
                )
                    .into_response()
            }
            Self::Generation(err) => {
                tracing::error!(error = %err, "itinerary generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message_body("Failed to generate itinerary"),
                )
                    .into_response()
            }
        }
    }
}

fn message_body(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": message }))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
