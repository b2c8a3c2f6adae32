//! Data-fetching client for the trip planner API.
//!
//! Reads are cached per client instance, keyed by route path (and id for
//! single-record fetches). Any successful mutation invalidates the keys it
//! could have staled, so the next read refetches. A 404 on a single-record
//! fetch means "no such record" (`None`); any other non-OK read is a hard
//! failure. Mutation failures carry the server's message text so it can be
//! shown to the user as-is.

use std::collections::HashMap;

use db::models::generate::{GenerateItineraryRequest, GeneratedItinerary};
use db::models::itinerary::{
    CreateItineraryRequest, Itinerary, ItineraryWithItems, UpdateItinerary,
};
use db::models::itinerary_item::{CreateItineraryItemRequest, ItineraryItem};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

const LIST_PATH: &str = "/api/itineraries";
const GENERATE_PATH: &str = "/api/ai/generate-itinerary";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-OK response; `message` is what the user should see.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session_token: String,
    cache: Mutex<HashMap<String, Value>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: session_token.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn record_path(id: i64) -> String {
        format!("{LIST_PATH}/{id}")
    }

    /// GET /api/itineraries
    pub async fn list_itineraries(&self) -> Result<Vec<Itinerary>, ClientError> {
        let listed = self.cached_get(LIST_PATH).await?;
        Ok(listed.unwrap_or_default())
    }

    /// GET /api/itineraries/{id}; `None` when the record does not exist.
    pub async fn get_itinerary(&self, id: i64) -> Result<Option<ItineraryWithItems>, ClientError> {
        self.cached_get(&Self::record_path(id)).await
    }

    /// POST /api/itineraries
    pub async fn create_itinerary(
        &self,
        request: &CreateItineraryRequest,
    ) -> Result<Itinerary, ClientError> {
        let response = self
            .http
            .post(format!("{}{LIST_PATH}", self.base_url))
            .bearer_auth(&self.session_token)
            .json(request)
            .send()
            .await?;
        let created: Itinerary = self
            .mutation_response(response, "Failed to create itinerary")
            .await?;

        self.invalidate([LIST_PATH.to_string()]).await;
        info!(id = created.id, "itinerary saved");
        Ok(created)
    }

    /// PUT /api/itineraries/{id}
    pub async fn update_itinerary(
        &self,
        id: i64,
        updates: &UpdateItinerary,
    ) -> Result<Itinerary, ClientError> {
        let response = self
            .http
            .put(format!("{}{}", self.base_url, Self::record_path(id)))
            .bearer_auth(&self.session_token)
            .json(updates)
            .send()
            .await?;
        let updated: Itinerary = self
            .mutation_response(response, "Failed to update itinerary")
            .await?;

        self.invalidate([LIST_PATH.to_string(), Self::record_path(id)]).await;
        info!(id, "itinerary updated");
        Ok(updated)
    }

    /// DELETE /api/itineraries/{id}
    pub async fn delete_itinerary(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(format!("{}{}", self.base_url, Self::record_path(id)))
            .bearer_auth(&self.session_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.error_from(response, "Failed to delete itinerary").await);
        }

        self.invalidate([LIST_PATH.to_string(), Self::record_path(id)]).await;
        info!(id, "itinerary removed");
        Ok(())
    }

    /// POST /api/itineraries/{id}/items
    pub async fn create_itinerary_item(
        &self,
        itinerary_id: i64,
        item: &CreateItineraryItemRequest,
    ) -> Result<ItineraryItem, ClientError> {
        let response = self
            .http
            .post(format!(
                "{}{}/items",
                self.base_url,
                Self::record_path(itinerary_id)
            ))
            .bearer_auth(&self.session_token)
            .json(item)
            .send()
            .await?;
        let created: ItineraryItem = self
            .mutation_response(response, "Failed to add activity")
            .await?;

        self.invalidate([Self::record_path(itinerary_id)]).await;
        Ok(created)
    }

    /// DELETE /api/itineraries/{id}/items/{item_id}
    pub async fn delete_itinerary_item(
        &self,
        itinerary_id: i64,
        item_id: i64,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(format!(
                "{}{}/items/{item_id}",
                self.base_url,
                Self::record_path(itinerary_id)
            ))
            .bearer_auth(&self.session_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.error_from(response, "Failed to remove activity").await);
        }

        self.invalidate([Self::record_path(itinerary_id)]).await;
        Ok(())
    }

    /// POST /api/ai/generate-itinerary. Drafts are never cached.
    pub async fn generate_itinerary(
        &self,
        request: &GenerateItineraryRequest,
    ) -> Result<GeneratedItinerary, ClientError> {
        let response = self
            .http
            .post(format!("{}{GENERATE_PATH}", self.base_url))
            .bearer_auth(&self.session_token)
            .json(request)
            .send()
            .await?;
        self.mutation_response(response, "Failed to generate itinerary")
            .await
    }

    /// Cache-first GET. `Ok(None)` means the server said 404.
    async fn cached_get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        if let Some(value) = self.cache.lock().await.get(path).cloned() {
            return decode(value).map(Some);
        }

        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.session_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value: Value = response.json().await?;
                self.cache
                    .lock()
                    .await
                    .insert(path.to_string(), value.clone());
                decode(value).map(Some)
            }
            status => Err(ClientError::Api {
                status: status.as_u16(),
                message: format!("Failed to fetch {path}"),
            }),
        }
    }

    async fn mutation_response<T: DeserializeOwned>(
        &self,
        response: Response,
        fallback: &str,
    ) -> Result<T, ClientError> {
        if !response.status().is_success() {
            return Err(self.error_from(response, fallback).await);
        }
        let value: Value = response.json().await?;
        decode(value)
    }

    /// Build an error from a failed response, preferring the server's
    /// `message` text over the generic fallback.
    async fn error_from(&self, response: Response, fallback: &str) -> ClientError {
        let status = response.status().as_u16();
        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("message")?.as_str().map(str::to_string))
            .unwrap_or_else(|| fallback.to_string());
        ClientError::Api { status, message }
    }

    async fn invalidate<I: IntoIterator<Item = String>>(&self, paths: I) {
        let mut cache = self.cache.lock().await;
        for path in paths {
            cache.remove(&path);
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}
