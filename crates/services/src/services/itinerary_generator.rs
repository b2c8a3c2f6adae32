//! Generates draft itineraries from trip parameters via one completion call.

use db::models::generate::{GenerateItinerary, GeneratedItinerary};
use thiserror::Error;
use tracing::info;

use super::completion_api::{CompletionApiClient, CompletionApiError};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("completion api error: {0}")]
    CompletionApi(#[from] CompletionApiError),
}

/// One-shot itinerary generator. Holds the prompt contract; the model's
/// reply must parse into [`GeneratedItinerary`] or the call fails.
#[derive(Debug, Clone)]
pub struct ItineraryGenerator {
    client: CompletionApiClient,
}

impl ItineraryGenerator {
    pub fn new(client: CompletionApiClient) -> Self {
        Self { client }
    }

    pub fn from_env() -> Result<Self, GeneratorError> {
        Ok(Self::new(CompletionApiClient::from_env()?))
    }

    /// Ask the model for a day-by-day plan matching the request.
    pub async fn generate(
        &self,
        request: &GenerateItinerary,
    ) -> Result<GeneratedItinerary, GeneratorError> {
        let prompt = build_prompt(request);
        let generated: GeneratedItinerary = self.client.ask_json(&prompt).await?;

        info!(
            location = %request.location,
            days = request.days,
            item_count = generated.items.len(),
            "generated itinerary"
        );

        Ok(generated)
    }
}

fn build_prompt(request: &GenerateItinerary) -> String {
    let preferences = request
        .preferences
        .as_deref()
        .unwrap_or("General sightseeing");

    format!(
        r#"Generate a {days}-day travel itinerary for {location}.
Preferences: {preferences}.
Start Date: {start_date}.

Return JSON format with:
{{
  "title": "Trip Title",
  "items": [
    {{
      "day": 1,
      "time": "10:00",
      "activity": "Activity Name",
      "location": "Location Name",
      "notes": "Description",
      "type": "sightseeing"
    }}
  ]
}}
Do not include markdown formatting, just raw JSON."#,
        days = request.days,
        location = request.location,
        start_date = request.start_date,
    )
}
