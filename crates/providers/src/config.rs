use std::time::Duration;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Settings for the remote backends.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
