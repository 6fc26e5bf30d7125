//! Provider selection and fallback.
//!
//! `run_analysis` never fails: whatever goes wrong with a remote backend is
//! logged and replaced by the deterministic generator, with the outcome
//! flagged as degraded.

use std::fmt;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use implodesc_core::SessionId;

use crate::anthropic::AnthropicBackend;
use crate::backend::ChatBackend;
use crate::config::ProviderConfig;
use crate::credentials::{CredentialResolver, ProviderAvailability, ProviderKind};
use crate::mock::MockGenerator;
use crate::openai::OpenAiBackend;
use crate::parse::{ParseTier, parse_report};
use crate::prompt::AnalysisRequest;
use crate::questions::{ClarificationQuestion, generate_questions};
use crate::report::SupplyChainReport;
use crate::retry::RetryPolicy;

/// Which backend produced a report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisProvider {
    OpenAi,
    Anthropic,
    Mock,
}

impl From<ProviderKind> for AnalysisProvider {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OpenAi => AnalysisProvider::OpenAi,
            ProviderKind::Anthropic => AnalysisProvider::Anthropic,
        }
    }
}

impl fmt::Display for AnalysisProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisProvider::OpenAi => "openai",
            AnalysisProvider::Anthropic => "anthropic",
            AnalysisProvider::Mock => "mock",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub report: SupplyChainReport,
    pub provider: AnalysisProvider,
    /// A remote backend was selected but failed.
    pub degraded: bool,
    pub fallback_reason: Option<String>,
    /// `None` for generated reports.
    pub parse_tier: Option<ParseTier>,
}

/// The backend chosen for one run.
enum Selection {
    Remote { kind: ProviderKind, api_key: String },
    Deterministic,
}

pub struct ProviderGateway {
    credentials: Arc<CredentialResolver>,
    openai: Arc<dyn ChatBackend>,
    anthropic: Arc<dyn ChatBackend>,
    mock: MockGenerator,
    retry: RetryPolicy,
}

impl fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ProviderGateway {
    /// Gateway backed by the real HTTP backends.
    pub fn new(credentials: Arc<CredentialResolver>, config: &ProviderConfig) -> Self {
        let client = Client::new();
        Self::with_backends(
            credentials,
            Arc::new(OpenAiBackend::new(client.clone(), config)),
            Arc::new(AnthropicBackend::new(client, config)),
            RetryPolicy::exponential(config.max_attempts, config.timeout),
        )
    }

    pub fn with_backends(
        credentials: Arc<CredentialResolver>,
        openai: Arc<dyn ChatBackend>,
        anthropic: Arc<dyn ChatBackend>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            credentials,
            openai,
            anthropic,
            mock: MockGenerator,
            retry,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialResolver> {
        &self.credentials
    }

    pub fn available_providers(&self, session_id: Option<SessionId>) -> ProviderAvailability {
        self.credentials.available(session_id)
    }

    /// Clarifying questions for an item. `prior` is accepted for callers that
    /// already have a report; the question set does not depend on it.
    pub fn generate_clarification_questions(
        &self,
        item_name: &str,
        prior: Option<&SupplyChainReport>,
    ) -> Vec<ClarificationQuestion> {
        if let Some(prior) = prior {
            debug!(item_name, materials = prior.materials.len(), "prior analysis supplied");
        }
        generate_questions(item_name)
    }

    pub async fn run_analysis(
        &self,
        request: &AnalysisRequest,
        session_id: Option<SessionId>,
    ) -> AnalysisOutcome {
        let session = session_id.map(|id| id.to_string()).unwrap_or_default();
        info!(
            session_id = %session,
            item_name = %request.item_name,
            quantity = request.quantity,
            "starting supply chain analysis"
        );

        let (kind, api_key) = match self.select(session_id) {
            Selection::Remote { kind, api_key } => (kind, api_key),
            Selection::Deterministic => {
                warn!(session_id = %session, "no provider keys available, using deterministic analysis");
                return self.deterministic(request, None);
            }
        };

        let prompt = request.prompt();
        debug!(session_id = %session, provider = %kind, prompt_length = prompt.len(), "prompt built");

        let backend = self.backend(kind);
        let result = self
            .retry
            .run(kind, || backend.complete(&api_key, &prompt))
            .await;

        match result {
            Ok(text) => {
                let (report, tier) = parse_report(&text);
                if tier == ParseTier::Wrapped {
                    warn!(session_id = %session, provider = %kind, "response was not JSON, wrapped as summary");
                } else {
                    info!(session_id = %session, provider = %kind, tier = ?tier, "analysis received");
                }
                AnalysisOutcome {
                    report,
                    provider: kind.into(),
                    degraded: false,
                    fallback_reason: None,
                    parse_tier: Some(tier),
                }
            }
            Err(error) => {
                warn!(
                    session_id = %session,
                    provider = %kind,
                    error = %error,
                    "provider failed, falling back to deterministic analysis"
                );
                self.deterministic(request, Some(error.to_string()))
            }
        }
    }

    fn select(&self, session_id: Option<SessionId>) -> Selection {
        ProviderKind::PRIORITY
            .into_iter()
            .find_map(|kind| {
                self.credentials
                    .resolve(kind, session_id)
                    .map(|api_key| Selection::Remote { kind, api_key })
            })
            .unwrap_or(Selection::Deterministic)
    }

    fn backend(&self, kind: ProviderKind) -> &Arc<dyn ChatBackend> {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }

    fn deterministic(&self, request: &AnalysisRequest, failure: Option<String>) -> AnalysisOutcome {
        AnalysisOutcome {
            report: self.mock.generate(&request.item_name, request.quantity),
            provider: AnalysisProvider::Mock,
            degraded: failure.is_some(),
            fallback_reason: failure,
            parse_tier: None,
        }
    }
}
