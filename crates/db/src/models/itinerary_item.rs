use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::validation::{ValidationError, require_text};

/// Classification applied when a request or the model omits the type.
pub const DEFAULT_ITEM_TYPE: &str = "sightseeing";

/// One scheduled activity within an itinerary. `item_type` is free text by
/// convention (sightseeing, food, transport, lodging), not an enum.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItem {
    pub id: i64,
    pub itinerary_id: i64,
    pub day: i64,
    pub time: Option<String>,
    pub activity: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(rename = "type")]
    pub item_type: String,
}

/// Validated insert data for one item; the parent id is supplied separately.
#[derive(Debug, Clone)]
pub struct CreateItineraryItem {
    pub day: i64,
    pub time: Option<String>,
    pub activity: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub item_type: String,
}

/// Wire shape of an item inside a create body, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItineraryItemRequest {
    pub day: Option<i64>,
    pub time: Option<String>,
    pub activity: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
}

impl CreateItineraryItemRequest {
    /// Validate one item of a create body. `index` feeds the reported field
    /// path, e.g. `items.0.activity`.
    pub fn into_validated(self, index: usize) -> Result<CreateItineraryItem, ValidationError> {
        self.validate_at(&format!("items.{index}"))
    }

    /// Validate a standalone item body (`POST /api/itineraries/{id}/items`).
    pub fn into_validated_standalone(self) -> Result<CreateItineraryItem, ValidationError> {
        self.validate_at("")
    }

    fn validate_at(self, prefix: &str) -> Result<CreateItineraryItem, ValidationError> {
        let path = |field: &str| {
            if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{prefix}.{field}")
            }
        };

        let day = self.day.ok_or_else(|| ValidationError::missing(path("day")))?;
        if day < 1 {
            return Err(ValidationError::new(path("day"), "day must be at least 1"));
        }
        let activity = require_text(&path("activity"), self.activity)?;

        Ok(CreateItineraryItem {
            day,
            time: self.time,
            activity,
            location: self.location,
            notes: self.notes,
            item_type: self
                .item_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ITEM_TYPE.to_string()),
        })
    }
}

const ITEM_COLUMNS: &str = "id, itinerary_id, day, time, activity, location, notes, item_type";

impl ItineraryItem {
    /// Items for an itinerary ordered by day, then time as a plain string
    /// comparison (entries without a time sort first within their day).
    pub async fn find_by_itinerary_id(
        pool: &SqlitePool,
        itinerary_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ItineraryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM itinerary_items \
             WHERE itinerary_id = $1 \
             ORDER BY day ASC, time ASC"
        ))
        .bind(itinerary_id)
        .fetch_all(pool)
        .await
    }

    /// Single-row insert; no transactional coupling with the parent.
    pub async fn create(
        pool: &SqlitePool,
        itinerary_id: i64,
        data: &CreateItineraryItem,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ItineraryItem>(&format!(
            "INSERT INTO itinerary_items \
               (itinerary_id, day, time, activity, location, notes, item_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(itinerary_id)
        .bind(data.day)
        .bind(&data.time)
        .bind(&data.activity)
        .bind(&data.location)
        .bind(&data.notes)
        .bind(&data.item_type)
        .fetch_one(pool)
        .await
    }

    /// Delete one item, scoped to its parent so a caller cannot remove an
    /// item through a foreign itinerary's route.
    pub async fn delete_for_itinerary(
        pool: &SqlitePool,
        id: i64,
        itinerary_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM itinerary_items WHERE id = $1 AND itinerary_id = $2",
        )
        .bind(id)
        .bind(itinerary_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
