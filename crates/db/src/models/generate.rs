//! Wire contract for AI itinerary generation.

use serde::{Deserialize, Serialize};

use super::itinerary_item::DEFAULT_ITEM_TYPE;
use super::validation::{ValidationError, require_text};

/// Trip length accepted by the generator, inclusive.
pub const MIN_TRIP_DAYS: i64 = 1;
pub const MAX_TRIP_DAYS: i64 = 14;

/// Body of `POST /api/ai/generate-itinerary` before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateItineraryRequest {
    pub location: Option<String>,
    pub days: Option<i64>,
    pub preferences: Option<String>,
    /// ISO-8601 date string, passed through to the prompt verbatim.
    pub start_date: Option<String>,
}

/// Validated trip parameters handed to the generator.
#[derive(Debug, Clone)]
pub struct GenerateItinerary {
    pub location: String,
    pub days: i64,
    pub preferences: Option<String>,
    pub start_date: String,
}

impl GenerateItineraryRequest {
    pub fn into_validated(self) -> Result<GenerateItinerary, ValidationError> {
        let location = require_text("location", self.location)?;
        let days = self.days.ok_or_else(|| ValidationError::missing("days"))?;
        if !(MIN_TRIP_DAYS..=MAX_TRIP_DAYS).contains(&days) {
            return Err(ValidationError::new(
                "days",
                format!("days must be between {MIN_TRIP_DAYS} and {MAX_TRIP_DAYS}"),
            ));
        }
        let start_date = require_text("startDate", self.start_date)?;

        Ok(GenerateItinerary {
            location,
            days,
            preferences: self.preferences.filter(|p| !p.trim().is_empty()),
            start_date,
        })
    }
}

/// Draft plan parsed from the model's JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedItinerary {
    pub title: String,
    pub items: Vec<GeneratedItem>,
}

/// One model-proposed activity. Everything but `day` and `activity` is
/// tolerated as absent; the type falls back to the sightseeing default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItem {
    pub day: i64,
    pub time: Option<String>,
    pub activity: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(rename = "type", default = "default_item_type")]
    pub item_type: String,
}

fn default_item_type() -> String {
    DEFAULT_ITEM_TYPE.to_string()
}
