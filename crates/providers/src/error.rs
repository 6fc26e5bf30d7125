use std::time::Duration;

use thiserror::Error;

use crate::credentials::ProviderKind;

/// Failure of a single backend call.
///
/// The gateway always absorbs these; they never reach the engine's callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{provider} request failed: {message}")]
    Request {
        provider: ProviderKind,
        message: String,
        retryable: bool,
    },

    #[error("{provider} returned HTTP {status}: {message}")]
    Status {
        provider: ProviderKind,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("{provider} did not answer within {timeout:?}")]
    Timeout {
        provider: ProviderKind,
        timeout: Duration,
    },

    #[error("{provider} returned an empty response")]
    Empty { provider: ProviderKind },

    #[error("failed to decode {provider} response: {message}")]
    Decode {
        provider: ProviderKind,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::Request { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Empty { provider }
            | ProviderError::Decode { provider, .. } => *provider,
        }
    }

    /// Connect failures, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Request { retryable, .. } | ProviderError::Status { retryable, .. } => {
                *retryable
            }
            ProviderError::Timeout { .. } => true,
            ProviderError::Empty { .. } | ProviderError::Decode { .. } => false,
        }
    }

    pub(crate) fn from_reqwest(provider: ProviderKind, err: reqwest::Error) -> Self {
        ProviderError::Request {
            provider,
            message: err.to_string(),
            retryable: err.is_connect() || err.is_timeout(),
        }
    }

    /// Non-success HTTP status with the provider's error message.
    pub(crate) fn from_status(provider: ProviderKind, status: u16, message: String) -> Self {
        let retryable = matches!(status, 429 | 500 | 502 | 503 | 504);
        ProviderError::Status {
            provider,
            status,
            message,
            retryable,
        }
    }
}
