//! Anthropic messages backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backend::ChatBackend;
use crate::config::ProviderConfig;
use crate::credentials::ProviderKind;
use crate::error::ProviderError;

const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicBackend {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            model: config.anthropic_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request<'a>(&'a self, prompt: &'a str) -> CreateMessageRequest<'a> {
        CreateMessageRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(ProviderKind::Anthropic, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read Anthropic error body".to_string());
            return Err(ProviderError::from_status(
                ProviderKind::Anthropic,
                status.as_u16(),
                error_message(&body),
            ));
        }

        let parsed: CreateMessageResponse =
            response.json().await.map_err(|err| ProviderError::Decode {
                provider: ProviderKind::Anthropic,
                message: err.to_string(),
            })?;

        extract_text_response(parsed)
    }
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    #[serde(default)]
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String, ProviderError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } if !text.trim().is_empty() => Some(text),
            _ => None,
        })
        .ok_or(ProviderError::Empty {
            provider: ProviderKind::Anthropic,
        })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string())
}
