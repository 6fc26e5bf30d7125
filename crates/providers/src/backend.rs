use async_trait::async_trait;

use crate::credentials::ProviderKind;
use crate::error::ProviderError;

/// A remote chat model that answers a prompt with text.
///
/// Implementations perform exactly one request per call; retries and
/// timeouts belong to the gateway.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    fn provider(&self) -> ProviderKind;

    /// Returns the model's text, or `ProviderError::Empty` when there is none.
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, ProviderError>;
}
