//! Domain error model.

use thiserror::Error;

use crate::status::AnalysisStatus;

/// Result type used across the engine.
pub type DomainResult<T> = Result<T, DomainError>;

/// Engine-level error.
///
/// Only input validation and lookup failures are meant to reach callers.
/// Provider failures are absorbed by the gateway; the variants exist so the
/// taxonomy stays complete and representable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed caller input, rejected before any state mutation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Unknown session id.
    #[error("session not found: {0}")]
    NotFound(String),

    /// Result requested before the analysis completed.
    #[error("analysis not completed (current status: {status})")]
    NotReady { status: AnalysisStatus },

    /// A completed session has no result payload. Indicates a bug.
    #[error("analysis result missing for completed session")]
    ResultMissing,

    /// Clarifications were submitted again and the resubmission policy rejects it.
    #[error("clarifications already submitted (current status: {status})")]
    AlreadySubmitted { status: AnalysisStatus },

    /// A state-machine invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// No usable credential and the mock backend is disabled.
    #[error("no analysis provider available: {0}")]
    ProviderUnavailable(String),

    /// Transient provider failure (network, parse).
    #[error("provider failure: {0}")]
    ProviderFailure(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound(id.to_string())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Whether the error is a caller mistake (as opposed to an internal failure).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidId(_)
                | Self::NotFound(_)
                | Self::NotReady { .. }
                | Self::AlreadySubmitted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_message_names_status() {
        let err = DomainError::NotReady {
            status: AnalysisStatus::Processing,
        };
        assert_eq!(
            err.to_string(),
            "analysis not completed (current status: processing)"
        );
    }

    #[test]
    fn internal_failures_are_not_client_errors() {
        assert!(DomainError::invalid_input("x").is_client_error());
        assert!(DomainError::not_found("abc").is_client_error());
        assert!(!DomainError::ResultMissing.is_client_error());
        assert!(!DomainError::ProviderFailure("boom".into()).is_client_error());
    }
}
