//! The engine facade: the six operations the transport layer calls, plus the
//! expiry sweep.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use implodesc_carbon::aggregate;
use implodesc_core::{Aggregate, AnalysisStatus, DomainError, DomainResult, SessionId};
use implodesc_providers::{
    AnalysisRequest, ClarificationQuestion, CredentialResolver, ProviderAvailability, ProviderGateway,
    ProviderKind,
};

use crate::analysis::{EnrichedAnalysis, SessionMetadata};
use crate::config::{EngineConfig, ResubmissionPolicy};
use crate::footprints::report_footprints;
use crate::session::{
    PROGRESS_ANALYZING, PROGRESS_CALCULATING, RecordProgress, STEP_ANALYZING, STEP_CALCULATING, Session,
    SessionCommand, StartSession, SubmitClarifications,
};
use crate::store::{SessionSlot, SessionStore};

const START_MESSAGE: &str = "Please provide clarifications to proceed with analysis";
const SUBMITTED_MESSAGE: &str = "Analysis started. Please check status for updates.";
const ALREADY_SUBMITTED_MESSAGE: &str = "Clarifications were already submitted; returning the current status.";

/// Reported to clients as the expected analysis duration.
pub const ESTIMATED_COMPLETION_SECONDS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartedAnalysis {
    pub session_id: SessionId,
    pub questions: Vec<ClarificationQuestion>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationAnswer {
    pub question_id: String,
    pub answer: String,
}

impl ClarificationAnswer {
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedClarifications {
    pub session_id: SessionId,
    pub status: AnalysisStatus,
    pub estimated_completion_seconds: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub session_id: SessionId,
    pub status: AnalysisStatus,
    pub progress_percentage: u8,
    pub current_step: String,
    pub estimated_time_remaining: Option<u64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResultView {
    pub session_id: SessionId,
    pub item_name: String,
    pub analysis_result: EnrichedAnalysis,
    pub created_at: DateTime<Utc>,
    pub clarifications_used: BTreeMap<String, String>,
}

/// Analysis orchestration engine. Construct once and share through `Arc`.
#[derive(Debug)]
pub struct AnalysisEngine {
    inner: Arc<EngineInner>,
}

/// State shared with detached analysis runs.
#[derive(Debug)]
struct EngineInner {
    config: EngineConfig,
    store: SessionStore,
    gateway: ProviderGateway,
}

impl AnalysisEngine {
    /// Engine with the real HTTP backends and process-wide keys from `config`.
    pub fn new(config: EngineConfig) -> Self {
        let credentials = Arc::new(CredentialResolver::new(
            config.provider.openai_api_key.clone(),
            config.provider.anthropic_api_key.clone(),
        ));
        let gateway = ProviderGateway::new(credentials, &config.provider);
        Self::with_gateway(config, gateway)
    }

    pub fn with_gateway(config: EngineConfig, gateway: ProviderGateway) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store: SessionStore::new(config.max_sessions),
                config,
                gateway,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn session_count(&self) -> usize {
        self.inner.store.len()
    }

    pub fn start_analysis(
        &self,
        item_name: &str,
        description: Option<&str>,
        quantity: u32,
    ) -> DomainResult<StartedAnalysis> {
        let now = Utc::now();
        let horizon = chrono::Duration::from_std(self.inner.config.completion_horizon)
            .map_err(|err| DomainError::invariant(format!("completion horizon out of range: {err}")))?;

        let mut session = Session::empty(SessionId::new());
        session.execute(&SessionCommand::Start(StartSession {
            item_name: item_name.to_string(),
            description: description.map(str::to_string),
            quantity,
            estimated_completion: now + horizon,
            occurred_at: now,
        }))?;

        let session_id = session.session_id();
        let questions = self
            .inner
            .gateway
            .generate_clarification_questions(session.item_name(), None);

        info!(
            session_id = %session_id,
            item_name = %session.item_name(),
            quantity,
            questions = questions.len(),
            "analysis session started"
        );

        let evicted = self.inner.store.insert(session)?;
        self.inner.forget_credentials(&evicted);

        Ok(StartedAnalysis {
            session_id,
            questions,
            message: START_MESSAGE.to_string(),
        })
    }

    /// Record the answers and run the analysis to completion.
    ///
    /// The run happens on its own task: once accepted, it reaches `Completed`
    /// or `Failed` even if the caller stops waiting. Submissions for the same
    /// session serialize on its run lock; what a repeat submission does is set
    /// by the resubmission policy.
    pub async fn submit_clarifications(
        &self,
        session_id: SessionId,
        answers: Vec<ClarificationAnswer>,
    ) -> DomainResult<SubmittedClarifications> {
        let slot = self.inner.store.get(session_id)?;
        if let Some(blank) = answers.iter().find(|a| a.question_id.trim().is_empty()) {
            return Err(DomainError::invalid_input(format!(
                "question_id cannot be empty (answer {:?})",
                blank.answer
            )));
        }

        let inner = Arc::clone(&self.inner);
        let run = tokio::spawn(async move { inner.submit(session_id, slot, answers).await });
        run.await
            .map_err(|err| DomainError::invariant(format!("analysis task for {session_id} ended abnormally: {err}")))?
    }

    pub fn get_status(&self, session_id: SessionId) -> DomainResult<StatusView> {
        let slot = self.inner.store.get(session_id)?;
        slot.read(|s| StatusView {
            session_id,
            status: s.status(),
            progress_percentage: s.progress(),
            current_step: s.current_step().to_string(),
            estimated_time_remaining: s.remaining_seconds(),
            message: s.status_message(),
        })
    }

    pub fn get_result(&self, session_id: SessionId) -> DomainResult<AnalysisResultView> {
        let slot = self.inner.store.get(session_id)?;
        slot.read(|s| {
            if s.status() != AnalysisStatus::Completed {
                return Err(DomainError::NotReady { status: s.status() });
            }
            let result = s.result().ok_or(DomainError::ResultMissing)?;
            Ok(AnalysisResultView {
                session_id,
                item_name: s.item_name().to_string(),
                analysis_result: result.clone(),
                created_at: s.created_at(),
                clarifications_used: s.clarifications().clone(),
            })
        })?
    }

    /// Store per-session provider keys; returns the providers accepted.
    pub fn set_credentials(
        &self,
        session_id: SessionId,
        keys: &HashMap<String, String>,
    ) -> DomainResult<Vec<ProviderKind>> {
        let slot = self.inner.store.get(session_id)?;
        self.inner.attach_credentials(session_id, &slot, keys)
    }

    pub fn available_providers(&self, session_id: Option<SessionId>) -> ProviderAvailability {
        self.inner.gateway.available_providers(session_id)
    }

    /// Remove sessions idle for longer than the configured TTL.
    pub fn sweep_expired(&self) -> DomainResult<Vec<SessionId>> {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> DomainResult<Vec<SessionId>> {
        let expired = self.inner.store.sweep_expired(now, self.inner.config.session_ttl)?;
        self.inner.forget_credentials(&expired);
        if !expired.is_empty() {
            info!(count = expired.len(), "expired sessions removed");
        }
        Ok(expired)
    }
}

impl EngineInner {
    async fn submit(
        &self,
        session_id: SessionId,
        slot: Arc<SessionSlot>,
        answers: Vec<ClarificationAnswer>,
    ) -> DomainResult<SubmittedClarifications> {
        let _run = slot.lock_run().await;
        // Evicted while we waited.
        if !self.store.holds(session_id, &slot) {
            return Err(DomainError::not_found(session_id));
        }

        let status = slot.read(Session::status)?;
        if status != AnalysisStatus::Pending {
            match self.config.resubmission_policy {
                ResubmissionPolicy::ReturnCurrent => {
                    info!(session_id = %session_id, status = %status, "clarifications already submitted");
                    return Ok(submitted(session_id, status, ALREADY_SUBMITTED_MESSAGE));
                }
                ResubmissionPolicy::Redo if status.is_terminal() => {
                    info!(session_id = %session_id, status = %status, "re-running analysis");
                    slot.execute(&SessionCommand::Reopen { occurred_at: Utc::now() })?;
                }
                ResubmissionPolicy::Reject | ResubmissionPolicy::Redo => {
                    return Err(DomainError::AlreadySubmitted { status });
                }
            }
        }

        slot.execute(&SessionCommand::SubmitClarifications(SubmitClarifications {
            answers: answers
                .into_iter()
                .map(|a| (a.question_id.trim().to_string(), a.answer))
                .collect(),
            occurred_at: Utc::now(),
        }))?;
        info!(session_id = %session_id, "clarifications submitted");

        match self.run_analysis(&slot).await {
            Ok(result) => {
                slot.execute(&SessionCommand::Complete {
                    result: Box::new(result),
                    occurred_at: Utc::now(),
                })?;
                info!(session_id = %session_id, "analysis completed");
            }
            Err(err) => {
                error!(session_id = %session_id, error = %err, "analysis failed");
                slot.execute(&SessionCommand::Fail {
                    reason: err.to_string(),
                    occurred_at: Utc::now(),
                })?;
            }
        }

        let status = slot.read(Session::status)?;
        Ok(submitted(session_id, status, SUBMITTED_MESSAGE))
    }

    async fn run_analysis(&self, slot: &SessionSlot) -> DomainResult<EnrichedAnalysis> {
        record_progress(slot, PROGRESS_ANALYZING, STEP_ANALYZING)?;

        let session = slot.snapshot()?;
        let quantity = session.effective_quantity();
        if quantity != session.quantity() {
            info!(
                session_id = %session.session_id(),
                requested = session.quantity(),
                quantity,
                "quantity taken from clarifications"
            );
        }

        let request = AnalysisRequest {
            item_name: session.item_name().to_string(),
            description: session.description().map(str::to_string),
            quantity,
            clarifications: session.clarifications().clone(),
        };
        let outcome = self
            .gateway
            .run_analysis(&request, Some(session.session_id()))
            .await;
        if outcome.degraded {
            warn!(
                session_id = %session.session_id(),
                reason = outcome.fallback_reason.as_deref().unwrap_or_default(),
                "analysis degraded to the reference model"
            );
        }

        record_progress(slot, PROGRESS_CALCULATING, STEP_CALCULATING)?;

        let footprints = report_footprints(&outcome.report, quantity, self.config.unit_weight_tonnes);
        let footprint = aggregate(&footprints);

        let metadata = SessionMetadata {
            session_id: session.session_id(),
            item_name: request.item_name,
            item_description: request.description,
            quantity,
            analysis_date: Utc::now(),
            clarifications_used: request.clarifications,
        };
        Ok(EnrichedAnalysis::build(outcome, footprint, metadata))
    }

    /// Write the overlay, then undo it if the session was evicted meanwhile.
    fn attach_credentials(
        &self,
        session_id: SessionId,
        slot: &Arc<SessionSlot>,
        keys: &HashMap<String, String>,
    ) -> DomainResult<Vec<ProviderKind>> {
        let accepted = self.gateway.credentials().set_credentials(session_id, keys);
        if !self.store.holds(session_id, slot) {
            self.gateway.credentials().clear_session(session_id);
            return Err(DomainError::not_found(session_id));
        }
        Ok(accepted)
    }

    fn forget_credentials(&self, sessions: &[SessionId]) {
        for id in sessions {
            self.gateway.credentials().clear_session(*id);
        }
    }
}

fn record_progress(slot: &SessionSlot, progress: u8, step: &str) -> DomainResult<()> {
    slot.execute(&SessionCommand::RecordProgress(RecordProgress {
        progress,
        step: step.to_string(),
        occurred_at: Utc::now(),
    }))
    .map(|_| ())
}

fn submitted(session_id: SessionId, status: AnalysisStatus, message: &str) -> SubmittedClarifications {
    SubmittedClarifications {
        session_id,
        status,
        estimated_completion_seconds: ESTIMATED_COMPLETION_SECONDS,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use implodesc_providers::{AnalysisProvider, QuestionKind};

    fn engine() -> AnalysisEngine {
        AnalysisEngine::new(EngineConfig::default())
    }

    #[test]
    fn start_returns_questions_and_pending_status() {
        let engine = engine();
        let started = engine.start_analysis("Cotton T-Shirt", Some("organic"), 1).unwrap();

        assert_eq!(started.message, START_MESSAGE);
        assert!(started.questions.iter().any(|q| q.kind == QuestionKind::Material));

        let status = engine.get_status(started.session_id).unwrap();
        assert_eq!(status.status, AnalysisStatus::Pending);
        assert_eq!(status.progress_percentage, 0);
        assert_eq!(status.estimated_time_remaining, Some(25));
    }

    #[test]
    fn invalid_start_stores_nothing() {
        let engine = engine();
        assert!(matches!(
            engine.start_analysis("  ", None, 1),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.start_analysis("Mug", None, 0),
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(engine.session_count(), 0);
    }

    #[test]
    fn unknown_sessions_are_not_found() {
        let engine = engine();
        let id = SessionId::new();
        assert!(matches!(engine.get_status(id), Err(DomainError::NotFound(_))));
        assert!(matches!(engine.get_result(id), Err(DomainError::NotFound(_))));
        assert!(matches!(
            engine.set_credentials(id, &HashMap::new()),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn result_before_completion_is_not_ready() {
        let engine = engine();
        let started = engine.start_analysis("Mug", None, 1).unwrap();
        assert_eq!(
            engine.get_result(started.session_id).unwrap_err(),
            DomainError::NotReady {
                status: AnalysisStatus::Pending
            }
        );
    }

    #[tokio::test]
    async fn without_keys_the_reference_model_completes_the_run() {
        let engine = engine();
        let started = engine.start_analysis("Cotton T-Shirt", None, 1).unwrap();

        let submitted = engine
            .submit_clarifications(started.session_id, vec![ClarificationAnswer::new("quantity", "2")])
            .await
            .unwrap();
        assert_eq!(submitted.status, AnalysisStatus::Completed);
        assert_eq!(submitted.estimated_completion_seconds, 30);
        assert_eq!(submitted.message, SUBMITTED_MESSAGE);

        let view = engine.get_result(started.session_id).unwrap();
        assert_eq!(view.item_name, "Cotton T-Shirt");
        assert_eq!(view.clarifications_used["quantity"], "2");
        assert_eq!(view.analysis_result.provider, AnalysisProvider::Mock);
        assert!(!view.analysis_result.degraded);
        assert_eq!(view.analysis_result.session_metadata.quantity, 2);
        // Reported headline scales with the clarified quantity.
        assert_eq!(
            view.analysis_result.report.environmental_impact.total_carbon_footprint_kg,
            "14".parse::<implodesc_carbon::Decimal>().unwrap()
        );
    }

    #[test]
    fn keys_written_for_an_evicted_session_are_withdrawn() {
        let engine = AnalysisEngine::new(EngineConfig {
            max_sessions: 1,
            ..EngineConfig::default()
        });
        let first = engine.start_analysis("Mug", None, 1).unwrap().session_id;
        let stale = engine.inner.store.get(first).unwrap();
        engine.start_analysis("Kettle", None, 1).unwrap();

        // Eviction lands between the lookup and the write.
        let keys = HashMap::from([("anthropic".to_string(), "sk-ant-test-0123".to_string())]);
        assert_eq!(
            engine.inner.attach_credentials(first, &stale, &keys).unwrap_err(),
            DomainError::not_found(first)
        );
        assert!(!engine.available_providers(Some(first)).anthropic);
        assert!(matches!(
            engine.set_credentials(first, &keys),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn sweep_clears_expired_sessions_and_their_keys() {
        let engine = engine();
        let started = engine.start_analysis("Mug", None, 1).unwrap();
        let keys = HashMap::from([("anthropic".to_string(), "sk-ant-test-0123".to_string())]);
        assert_eq!(
            engine.set_credentials(started.session_id, &keys).unwrap(),
            vec![ProviderKind::Anthropic]
        );
        assert!(engine.available_providers(Some(started.session_id)).anthropic);

        let later = Utc::now() + chrono::Duration::hours(2);
        assert_eq!(engine.sweep_expired_at(later).unwrap(), vec![started.session_id]);
        assert!(!engine.available_providers(Some(started.session_id)).anthropic);
        assert!(engine.get_status(started.session_id).is_err());
    }
}
