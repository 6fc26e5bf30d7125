//! `implodesc-providers`
//!
//! **Responsibility:** everything between the engine and the analysis backends.
//!
//! - Per-session credential overlay on top of process-wide keys.
//! - Prompt construction and tolerant parsing of model output.
//! - Network backends (OpenAI chat completions, Anthropic messages) behind one trait.
//! - A deterministic generator used when no backend is usable.
//! - The gateway that picks a backend, retries, and falls back.
//!
//! This crate never mutates session state; it returns reports.

pub mod anthropic;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod openai;
pub mod parse;
pub mod prompt;
pub mod questions;
pub mod report;
pub mod retry;

pub use backend::ChatBackend;
pub use config::ProviderConfig;
pub use credentials::{CredentialResolver, ProviderAvailability, ProviderKind};
pub use error::ProviderError;
pub use gateway::{AnalysisOutcome, AnalysisProvider, ProviderGateway};
pub use mock::MockGenerator;
pub use parse::{ParseTier, parse_report};
pub use prompt::AnalysisRequest;
pub use questions::{ClarificationQuestion, QuestionKind, generate_questions};
pub use report::{
    CarbonIntensity, CompanyEntry, EnvironmentalImpact, MaterialEntry, ProcessEntry,
    SupplyChainReport, TransportLeg,
};
pub use retry::{BackoffStrategy, RetryPolicy};
