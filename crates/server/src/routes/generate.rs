//! Route for AI itinerary generation.

use axum::{Json, Router, extract::State, response::Json as ResponseJson, routing::post};
use db::models::generate::{GenerateItineraryRequest, GeneratedItinerary};

use crate::{AppState, auth::AuthUser, error::ApiError};

/// POST /api/ai/generate-itinerary
/// One synchronous pass through the completion API; the caller reviews the
/// draft and saves it via the create route.
pub async fn generate_itinerary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<GenerateItineraryRequest>,
) -> Result<ResponseJson<GeneratedItinerary>, ApiError> {
    let request = payload.into_validated()?;

    tracing::info!(
        user_id = %user_id,
        location = %request.location,
        days = request.days,
        "generating itinerary"
    );

    let generated = state.generator.generate(&request).await?;
    Ok(ResponseJson(generated))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/ai/generate-itinerary", post(generate_itinerary))
}
