//! Routes for itinerary CRUD.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::itinerary::{
    CreateItineraryRequest, Itinerary, ItineraryWithItems, UpdateItinerary,
};
use db::models::itinerary_item::{CreateItineraryItemRequest, ItineraryItem};
use sqlx::SqlitePool;

use crate::{AppState, auth::AuthUser, error::ApiError};

/// Load an itinerary and verify it belongs to the caller. The store does not
/// check ownership, so every by-id route goes through here.
async fn find_owned(pool: &SqlitePool, id: i64, user_id: &str) -> Result<Itinerary, ApiError> {
    let itinerary = Itinerary::find_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("itinerary"))?;
    if itinerary.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(itinerary)
}

/// GET /api/itineraries
pub async fn list_itineraries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ResponseJson<Vec<Itinerary>>, ApiError> {
    let itineraries = Itinerary::find_by_user_id(&state.pool, &user_id).await?;
    Ok(ResponseJson(itineraries))
}

/// GET /api/itineraries/{id}
pub async fn get_itinerary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ItineraryWithItems>, ApiError> {
    let itinerary = Itinerary::find_with_items(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("itinerary"))?;
    if itinerary.itinerary.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(ResponseJson(itinerary))
}

/// POST /api/itineraries
/// Save a generated or manually specified plan with its items.
pub async fn create_itinerary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateItineraryRequest>,
) -> Result<(StatusCode, ResponseJson<Itinerary>), ApiError> {
    let (data, items) = payload.into_validated(user_id)?;
    let itinerary = Itinerary::create_with_items(&state.pool, &data, &items).await?;
    Ok((StatusCode::CREATED, ResponseJson(itinerary)))
}

/// PUT /api/itineraries/{id}
pub async fn update_itinerary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateItinerary>,
) -> Result<ResponseJson<Itinerary>, ApiError> {
    let current = find_owned(&state.pool, id, &user_id).await?;
    payload.validate(&current)?;

    let updated = Itinerary::update(&state.pool, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("itinerary"))?;
    Ok(ResponseJson(updated))
}

/// DELETE /api/itineraries/{id}
pub async fn delete_itinerary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    find_owned(&state.pool, id, &user_id).await?;
    Itinerary::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/itineraries/{id}/items
pub async fn create_itinerary_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateItineraryItemRequest>,
) -> Result<(StatusCode, ResponseJson<ItineraryItem>), ApiError> {
    find_owned(&state.pool, id, &user_id).await?;
    let data = payload.into_validated_standalone()?;
    let item = ItineraryItem::create(&state.pool, id, &data).await?;
    Ok((StatusCode::CREATED, ResponseJson(item)))
}

/// DELETE /api/itineraries/{id}/items/{item_id}
pub async fn delete_itinerary_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    find_owned(&state.pool, id, &user_id).await?;
    let deleted = ItineraryItem::delete_for_itinerary(&state.pool, item_id, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("item"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/itineraries",
        Router::new()
            .route("/", get(list_itineraries).post(create_itinerary))
            .route(
                "/{id}",
                get(get_itinerary)
                    .put(update_itinerary)
                    .delete(delete_itinerary),
            )
            .route("/{id}/items", post(create_itinerary_item))
            .route("/{id}/items/{item_id}", delete(delete_itinerary_item)),
    )
}
