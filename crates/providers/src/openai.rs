//! OpenAI chat-completions backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backend::ChatBackend;
use crate::config::ProviderConfig;
use crate::credentials::ProviderKind;
use crate::error::ProviderError;
use crate::prompt::SYSTEM_MESSAGE;

const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiBackend {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            model: config.openai_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Point at a compatible endpoint (proxy, local gateway).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("content-type", "application/json")
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(ProviderKind::OpenAi, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read OpenAI error body".to_string());
            return Err(ProviderError::from_status(
                ProviderKind::OpenAi,
                status.as_u16(),
                error_message(&body),
            ));
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|err| ProviderError::Decode {
                provider: ProviderKind::OpenAi,
                message: err.to_string(),
            })?;

        extract_text_response(parsed)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ProviderError::Empty {
            provider: ProviderKind::OpenAi,
        })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string())
}
