//! Client for vLLM-compatible completion endpoints.
//!
//! Each worker owns one client pointed at one endpoint and submits plain
//! text prompts to `/v1/completions`. Responses are reduced to the first
//! choice's trimmed text; everything else about the payload is dropped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("API returned no completion text")]
    EmptyResponse,
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Model identifier the endpoint should route to.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sequences that terminate generation.
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            stop: vec![
                "Human:".to_string(),
                "Assistant:".to_string(),
                "\n\n---".to_string(),
            ],
        }
    }
}

/// Trait for backends that can complete a prompt.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Submits a prompt and returns the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// HTTP client for one completion endpoint.
pub struct CompletionClient {
    /// Base URL of the endpoint (e.g. "http://localhost:8000").
    base_url: String,
    /// Sampling parameters applied to every request.
    params: GenerationParams,
    /// HTTP client for making API requests.
    http_client: Client,
}

impl CompletionClient {
    /// Create a client for the endpoint at `host:port`.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{}", host, port),
            params: GenerationParams::default(),
            http_client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Replace the default sampling parameters.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Get the endpoint base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Internal request structure for the completions API.
#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f64,
    max_tokens: u32,
    stop: &'a [String],
}

/// Internal response structure from the completions API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

/// Internal choice structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiChoice {
    text: String,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Reduces an API response to the first choice's trimmed text.
fn extract_text(response: ApiResponse) -> Result<String, CompletionError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.text.trim().to_string())
        .ok_or(CompletionError::EmptyResponse)?;

    if text.is_empty() {
        return Err(CompletionError::EmptyResponse);
    }

    Ok(text)
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_request = ApiRequest {
            model: &self.params.model,
            prompt,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            stop: &self.params.stop,
        };

        let url = format!("{}/v1/completions", self.base_url);

        let http_response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| CompletionError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();

            // Try to parse error response body
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                return Err(CompletionError::ApiError {
                    code: status_code,
                    message: error_response.error.message,
                });
            }

            // Fall back to raw error text
            return Err(CompletionError::ApiError {
                code: status_code,
                message: error_text,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| CompletionError::ParseError(e.to_string()))?;

        extract_text(api_response)
    }
}
