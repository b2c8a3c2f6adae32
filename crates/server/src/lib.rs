//! HTTP layer: router assembly and shared application state.

use std::sync::Arc;

use axum::Router;
use services::services::itinerary_generator::ItineraryGenerator;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use auth::IdentityProvider;

/// Everything the route layer needs, constructed once at startup and passed
/// in explicitly.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub identity: Arc<dyn IdentityProvider>,
    pub generator: Arc<ItineraryGenerator>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::itineraries::router())
        .merge(routes::generate::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
