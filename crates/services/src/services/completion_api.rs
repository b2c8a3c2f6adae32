//! Chat-completion client for AI itinerary generation.
//!
//! Talks to an OpenAI-compatible `/chat/completions` endpoint and can ask
//! for JSON-formatted output via the `response_format` flag.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-5.1";

#[derive(Debug, Clone, Error)]
pub enum CompletionApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api key: OPENAI_API_KEY environment variable not set")]
    MissingApiKey,
}

impl CompletionApiError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// `response_format` flag instructing the model to emit a JSON object.
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl ResponseFormat {
    fn json_object() -> Self {
        Self {
            kind: "json_object",
        }
    }
}

/// Request body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// One completion choice in the response
#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Response from the chat completions endpoint
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Extract the text content of the first choice
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// Chat completion API client
#[derive(Debug, Clone)]
pub struct CompletionApiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl CompletionApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    /// Create a client from `OPENAI_API_KEY`, with optional `OPENAI_BASE_URL`
    /// and `OPENAI_MODEL` overrides.
    pub fn from_env() -> Result<Self, CompletionApiError> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| CompletionApiError::MissingApiKey)?;
        Self::new(
            api_key,
            std::env::var("OPENAI_BASE_URL").ok(),
            std::env::var("OPENAI_MODEL").ok(),
        )
    }

    /// Create a client with the given API key
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, CompletionApiError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("wayfarer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CompletionApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    /// Send a completion request, retrying transient failures.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        json_output: bool,
    ) -> Result<ChatCompletionResponse, CompletionApiError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            response_format: json_output.then(ResponseFormat::json_object),
        };

        (|| async { self.send_request(&request).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(30))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &CompletionApiError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "completion API call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    async fn send_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CompletionApiError> {
        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<ChatCompletionResponse>()
                .await
                .map_err(|e| CompletionApiError::Serde(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(CompletionApiError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(CompletionApiError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(CompletionApiError::Http { status, body })
            }
        }
    }

    /// Send a single prompt and parse the reply as JSON into `T`.
    pub async fn ask_json<T: for<'de> Deserialize<'de>>(
        &self,
        prompt: &str,
    ) -> Result<T, CompletionApiError> {
        let response = self
            .complete(vec![Message::user(prompt)], true)
            .await?
            .text()
            .map(str::to_string)
            .ok_or_else(|| {
                CompletionApiError::Serde("no text content in response".to_string())
            })?;

        if response.trim().is_empty() {
            tracing::error!("model returned an empty response");
            return Err(CompletionApiError::Serde("empty response from model".to_string()));
        }

        // The model is told not to use markdown, but strip fences anyway.
        let json_str = extract_json(&response);

        serde_json::from_str(json_str).map_err(|e| {
            tracing::error!(
                json_error = %e,
                response_length = response.len(),
                "failed to parse JSON from model response"
            );
            CompletionApiError::Serde(format!(
                "{} (response preview: {})",
                e,
                json_str.chars().take(500).collect::<String>()
            ))
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> CompletionApiError {
    if e.is_timeout() {
        CompletionApiError::Timeout
    } else {
        CompletionApiError::Transport(e.to_string())
    }
}

/// Extract JSON from a string that might contain markdown code blocks
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        // Skip past any language identifier on the same line
        let content_start = text[content_start..]
            .find('\n')
            .map(|i| content_start + i + 1)
            .unwrap_or(content_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}
