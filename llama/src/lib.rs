//! Minimal Llama chat-completion API client.
//!
//! This crate provides a focused client for Llama-style completion
//! endpoints with:
//! - Bearer-token authentication and a bounded request timeout
//! - A typed request builder
//! - Response parsing that accepts both the current
//!   `completion_message` shape and the legacy `choices` shape

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_MODEL: &str = "Llama-4-Maverick-17B-128E-Instruct-FP8";

/// Bound on how long a single completion request may block a turn.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when using the Llama client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("API endpoint not configured")]
    NoEndpoint,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Llama API client.
#[derive(Clone)]
pub struct Llama {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl Llama {
    /// Create a new Llama client with the given API key and endpoint.
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a client from the `LLAMA_API_KEY` and `LLAMA_API_ENDPOINT`
    /// environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("LLAMA_API_KEY").map_err(|_| Error::NoApiKey)?;
        let endpoint = std::env::var("LLAMA_API_ENDPOINT").map_err(|_| Error::NoEndpoint)?;
        Ok(Self::new(api_key, endpoint))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send a completion request and return the generated text, trimmed.
    pub async fn complete(&self, request: Request) -> Result<String, Error> {
        let api_request = ApiRequest {
            model: request.model.unwrap_or_else(|| self.model.clone()),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: request.content,
            }],
            max_completion_tokens: request.max_completion_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        extract_text(api_response)
    }
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub content: String,
    pub max_completion_tokens: usize,
    pub temperature: f32,
}

impl Request {
    /// Create a new request with the given user content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            model: None,
            content: content.into(),
            max_completion_tokens: 1024,
            temperature: 0.7,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_completion_tokens(mut self, tokens: usize) -> Self {
        self.max_completion_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_completion_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

/// Providers disagree on the response envelope: newer deployments return
/// `completion_message`, older ones the OpenAI-style `choices` array.
/// Both are modeled and tried in that order.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    completion_message: Option<CompletionMessage>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: CompletionContent,
}

/// `content` may be a bare string or an object carrying a `text` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionContent {
    Text(String),
    Object { text: String },
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

fn extract_text(response: ApiResponse) -> Result<String, Error> {
    if let Some(message) = response.completion_message {
        let text = match message.content {
            CompletionContent::Text(text) => text,
            CompletionContent::Object { text } => text,
        };
        return Ok(text.trim().to_string());
    }

    if let Some(choice) = response.choices.into_iter().next() {
        return Ok(choice.message.content.trim().to_string());
    }

    Err(Error::Parse(
        "response contained neither completion_message nor choices".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Llama::new("test-key", "https://example.com/v1/chat");
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.endpoint, "https://example.com/v1/chat");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new("Continue the story")
            .with_model("llama-4-turbo")
            .with_max_completion_tokens(500)
            .with_temperature(0.3);

        assert_eq!(request.model.as_deref(), Some("llama-4-turbo"));
        assert_eq!(request.max_completion_tokens, 500);
        assert_eq!(request.temperature, 0.3);
    }

    #[test]
    fn test_parse_completion_message_string() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"completion_message": {"content": "  Once upon a time.  "}}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Once upon a time.");
    }

    #[test]
    fn test_parse_completion_message_object() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"completion_message": {"content": {"text": "The tale begins."}}}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "The tale begins.");
    }

    #[test]
    fn test_parse_legacy_choices() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "A legacy reply."}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "A legacy reply.");
    }

    #[test]
    fn test_parse_empty_response_is_error() {
        let response: ApiResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(extract_text(response).is_err());
    }

    #[test]
    fn test_request_serialization() {
        let api_request = ApiRequest {
            model: "m".to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            max_completion_tokens: 64,
            temperature: 0.5,
        };

        let value = serde_json::to_value(&api_request).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_completion_tokens"], 64);
    }
}
