use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::itinerary_item::{CreateItineraryItem, CreateItineraryItemRequest, ItineraryItem};
use super::validation::{ValidationError, require_text};

/// A saved trip plan owned by one user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An itinerary joined with its scheduled activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryWithItems {
    #[serde(flatten)]
    pub itinerary: Itinerary,
    pub items: Vec<ItineraryItem>,
}

/// Validated insert data. `user_id` comes from the session, never the body.
#[derive(Debug, Clone)]
pub struct CreateItinerary {
    pub user_id: String,
    pub title: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Body of `POST /api/itineraries` before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItineraryRequest {
    pub title: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<CreateItineraryItemRequest>,
}

impl CreateItineraryRequest {
    /// Check the body field by field and attach the caller's identity,
    /// reporting the first failure as `{message, field}`.
    pub fn into_validated(
        self,
        user_id: String,
    ) -> Result<(CreateItinerary, Vec<CreateItineraryItem>), ValidationError> {
        let title = require_text("title", self.title)?;
        let location = require_text("location", self.location)?;
        let start_date = self.start_date.ok_or_else(|| ValidationError::missing("startDate"))?;
        let end_date = self.end_date.ok_or_else(|| ValidationError::missing("endDate"))?;
        if end_date < start_date {
            return Err(ValidationError::new(
                "endDate",
                "endDate must not be before startDate",
            ));
        }

        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.into_validated(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((
            CreateItinerary {
                user_id,
                title,
                location,
                start_date,
                end_date,
            },
            items,
        ))
    }
}

/// Body of `PUT /api/itineraries/{id}`: a partial field set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItinerary {
    pub title: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl UpdateItinerary {
    /// Validate the partial against the record it will be applied to, so the
    /// date-order invariant holds for the merged result.
    pub fn validate(&self, current: &Itinerary) -> Result<(), ValidationError> {
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            return Err(ValidationError::new("title", "title must not be empty"));
        }
        if let Some(location) = &self.location
            && location.trim().is_empty()
        {
            return Err(ValidationError::new(
                "location",
                "location must not be empty",
            ));
        }

        let start = self.start_date.unwrap_or(current.start_date);
        let end = self.end_date.unwrap_or(current.end_date);
        if end < start {
            return Err(ValidationError::new(
                "endDate",
                "endDate must not be before startDate",
            ));
        }
        Ok(())
    }
}

const ITINERARY_COLUMNS: &str = "id, user_id, title, location, start_date, end_date, created_at";

impl Itinerary {
    /// All itineraries owned by the user, most recent trip first.
    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Itinerary>(&format!(
            "SELECT {ITINERARY_COLUMNS} FROM itineraries \
             WHERE user_id = $1 \
             ORDER BY start_date DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Ownership is not checked here; callers compare `user_id` themselves.
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Itinerary>(&format!(
            "SELECT {ITINERARY_COLUMNS} FROM itineraries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// The itinerary with its items ordered by day, then time.
    pub async fn find_with_items(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<ItineraryWithItems>, sqlx::Error> {
        let Some(itinerary) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let items = ItineraryItem::find_by_itinerary_id(pool, id).await?;
        Ok(Some(ItineraryWithItems { itinerary, items }))
    }

    /// Insert the itinerary and all of its items as one transaction. If any
    /// item insert fails the itinerary row is rolled back with it.
    pub async fn create_with_items(
        pool: &SqlitePool,
        data: &CreateItinerary,
        items: &[CreateItineraryItem],
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let itinerary = sqlx::query_as::<_, Itinerary>(&format!(
            "INSERT INTO itineraries (user_id, title, location, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ITINERARY_COLUMNS}"
        ))
        .bind(&data.user_id)
        .bind(&data.title)
        .bind(&data.location)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO itinerary_items \
                   (itinerary_id, day, time, activity, location, notes, item_type) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(itinerary.id)
            .bind(item.day)
            .bind(&item.time)
            .bind(&item.activity)
            .bind(&item.location)
            .bind(&item.notes)
            .bind(&item.item_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(itinerary)
    }

    /// Apply a partial update. Returns `None` when no row has the id.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpdateItinerary,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Itinerary>(&format!(
            "UPDATE itineraries SET \
               title      = COALESCE($2, title), \
               location   = COALESCE($3, location), \
               start_date = COALESCE($4, start_date), \
               end_date   = COALESCE($5, end_date) \
             WHERE id = $1 \
             RETURNING {ITINERARY_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.title)
        .bind(&data.location)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_optional(pool)
        .await
    }

    /// Delete the row; the schema's cascade rule removes its items.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM itineraries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
