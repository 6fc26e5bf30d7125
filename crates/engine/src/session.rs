//! The analysis session aggregate.
//!
//! `Pending → Processing → {Completed, Failed}`. Decisions live in `handle`,
//! state changes in `apply`; the engine performs provider calls and feeds the
//! outcomes back as commands.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use implodesc_core::{Aggregate, AggregateRoot, AnalysisStatus, DomainError, SessionId};

use crate::analysis::EnrichedAnalysis;

pub const STEP_INITIALIZING: &str = "Initializing";
pub const STEP_CLARIFICATIONS: &str = "Processing clarifications";
pub const STEP_ANALYZING: &str = "Analyzing supply chain";
pub const STEP_CALCULATING: &str = "Calculating carbon footprint";
pub const STEP_COMPLETE: &str = "Analysis complete";

pub const PROGRESS_CLARIFIED: u8 = 10;
pub const PROGRESS_ANALYZING: u8 = 25;
pub const PROGRESS_CALCULATING: u8 = 75;
pub const PROGRESS_COMPLETE: u8 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    item_name: String,
    description: Option<String>,
    quantity: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    status: AnalysisStatus,
    progress: u8,
    current_step: String,
    clarifications: BTreeMap<String, String>,
    result: Option<Box<EnrichedAnalysis>>,
    estimated_completion: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    version: u64,
    created: bool,
}

impl Session {
    /// A not-yet-started session, ready for `SessionCommand::Start`.
    pub fn empty(id: SessionId) -> Self {
        Self {
            id,
            item_name: String::new(),
            description: None,
            quantity: 1,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            status: AnalysisStatus::Pending,
            progress: 0,
            current_step: STEP_INITIALIZING.to_string(),
            clarifications: BTreeMap::new(),
            result: None,
            estimated_completion: None,
            failure_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.id
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last applied event.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    pub fn clarifications(&self) -> &BTreeMap<String, String> {
        &self.clarifications
    }

    pub fn result(&self) -> Option<&EnrichedAnalysis> {
        self.result.as_deref()
    }

    pub fn estimated_completion(&self) -> Option<DateTime<Utc>> {
        self.estimated_completion
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Quantity for the analysis run: a positive integer `quantity` answer
    /// wins over the quantity given at start.
    pub fn effective_quantity(&self) -> u32 {
        self.clarifications
            .get("quantity")
            .and_then(|answer| answer.trim().parse::<u32>().ok())
            .filter(|q| *q >= 1)
            .unwrap_or(self.quantity)
    }

    /// Seconds left: `Completed` → 0, `Failed` → none, otherwise a step
    /// function of progress (≥90 → 5, ≥50 → 15, else 25).
    pub fn remaining_seconds(&self) -> Option<u64> {
        match self.status {
            AnalysisStatus::Completed => Some(0),
            AnalysisStatus::Failed => None,
            AnalysisStatus::Pending | AnalysisStatus::Processing => Some(remaining_for_progress(self.progress)),
        }
    }

    pub fn status_message(&self) -> String {
        match self.status {
            AnalysisStatus::Pending => "Analysis is queued and will start shortly".to_string(),
            AnalysisStatus::Processing => format!("Analysis in progress: {}", self.current_step),
            AnalysisStatus::Completed => "Analysis completed successfully".to_string(),
            // The step already reads "Analysis failed: <reason>".
            AnalysisStatus::Failed => self.current_step.clone(),
        }
    }
}

pub fn remaining_for_progress(progress: u8) -> u64 {
    if progress >= 90 {
        5
    } else if progress >= 50 {
        15
    } else {
        25
    }
}

impl AggregateRoot for Session {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartSession {
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: u32,
    pub estimated_completion: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitClarifications {
    /// Applied in order; a later answer for the same id wins.
    pub answers: Vec<(String, String)>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordProgress {
    pub progress: u8,
    pub step: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Start(StartSession),
    SubmitClarifications(SubmitClarifications),
    RecordProgress(RecordProgress),
    Complete {
        result: Box<EnrichedAnalysis>,
        occurred_at: DateTime<Utc>,
    },
    Fail {
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    /// Leave a terminal state to run again (resubmission policy `redo`).
    Reopen { occurred_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started(StartSession),
    ClarificationsSubmitted(SubmitClarifications),
    ProgressRecorded(RecordProgress),
    Completed {
        result: Box<EnrichedAnalysis>,
        occurred_at: DateTime<Utc>,
    },
    Failed {
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    Reopened { occurred_at: DateTime<Utc> },
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::Started(_) => "analysis.session.started",
            SessionEvent::ClarificationsSubmitted(_) => "analysis.session.clarifications_submitted",
            SessionEvent::ProgressRecorded(_) => "analysis.session.progress_recorded",
            SessionEvent::Completed { .. } => "analysis.session.completed",
            SessionEvent::Failed { .. } => "analysis.session.failed",
            SessionEvent::Reopened { .. } => "analysis.session.reopened",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SessionEvent::Started(e) => e.occurred_at,
            SessionEvent::ClarificationsSubmitted(e) => e.occurred_at,
            SessionEvent::ProgressRecorded(e) => e.occurred_at,
            SessionEvent::Completed { occurred_at, .. }
            | SessionEvent::Failed { occurred_at, .. }
            | SessionEvent::Reopened { occurred_at } => *occurred_at,
        }
    }
}

impl Aggregate for Session {
    type Command = SessionCommand;
    type Event = SessionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SessionEvent::Started(e) => {
                self.item_name = e.item_name.clone();
                self.description = e.description.clone();
                self.quantity = e.quantity;
                self.created_at = e.occurred_at;
                self.estimated_completion = Some(e.estimated_completion);
                self.status = AnalysisStatus::Pending;
                self.created = true;
            }
            SessionEvent::ClarificationsSubmitted(e) => {
                for (question_id, answer) in &e.answers {
                    self.clarifications.insert(question_id.clone(), answer.clone());
                }
                self.status = AnalysisStatus::Processing;
                self.progress = PROGRESS_CLARIFIED;
                self.current_step = STEP_CLARIFICATIONS.to_string();
            }
            SessionEvent::ProgressRecorded(e) => {
                self.progress = e.progress;
                self.current_step = e.step.clone();
            }
            SessionEvent::Completed { result, .. } => {
                self.result = Some(result.clone());
                self.status = AnalysisStatus::Completed;
                self.progress = PROGRESS_COMPLETE;
                self.current_step = STEP_COMPLETE.to_string();
            }
            SessionEvent::Failed { reason, .. } => {
                self.result = None;
                self.failure_reason = Some(reason.clone());
                self.status = AnalysisStatus::Failed;
                self.current_step = format!("Analysis failed: {reason}");
            }
            SessionEvent::Reopened { .. } => {
                self.result = None;
                self.failure_reason = None;
                self.status = AnalysisStatus::Pending;
                self.progress = 0;
                self.current_step = STEP_INITIALIZING.to_string();
            }
        }

        self.updated_at = event.occurred_at();
        // +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if !self.created && !matches!(command, SessionCommand::Start(_)) {
            return Err(DomainError::not_found(self.id));
        }

        match command {
            SessionCommand::Start(cmd) => self.handle_start(cmd),
            SessionCommand::SubmitClarifications(cmd) => self.handle_submit(cmd),
            SessionCommand::RecordProgress(cmd) => self.handle_progress(cmd),
            SessionCommand::Complete { result, occurred_at } => {
                self.ensure_status(AnalysisStatus::Processing, "complete")?;
                Ok(vec![SessionEvent::Completed {
                    result: result.clone(),
                    occurred_at: *occurred_at,
                }])
            }
            SessionCommand::Fail { reason, occurred_at } => {
                self.ensure_status(AnalysisStatus::Processing, "fail")?;
                Ok(vec![SessionEvent::Failed {
                    reason: reason.clone(),
                    occurred_at: *occurred_at,
                }])
            }
            SessionCommand::Reopen { occurred_at } => {
                if !self.status.is_terminal() {
                    return Err(DomainError::invariant(format!(
                        "cannot reopen a {} session",
                        self.status
                    )));
                }
                Ok(vec![SessionEvent::Reopened {
                    occurred_at: *occurred_at,
                }])
            }
        }
    }
}

impl Session {
    fn ensure_status(&self, expected: AnalysisStatus, action: &str) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::invariant(format!(
                "cannot {action} a {} session",
                self.status
            )));
        }
        Ok(())
    }

    fn handle_start(&self, cmd: &StartSession) -> Result<Vec<SessionEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("session already started"));
        }
        let item_name = cmd.item_name.trim();
        if item_name.is_empty() {
            return Err(DomainError::invalid_input("item_name cannot be empty"));
        }
        if cmd.quantity < 1 {
            return Err(DomainError::invalid_input("quantity must be at least 1"));
        }
        let description = cmd
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(vec![SessionEvent::Started(StartSession {
            item_name: item_name.to_string(),
            description,
            quantity: cmd.quantity,
            estimated_completion: cmd.estimated_completion,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitClarifications) -> Result<Vec<SessionEvent>, DomainError> {
        if self.status != AnalysisStatus::Pending {
            return Err(DomainError::AlreadySubmitted {
                status: self.status,
            });
        }
        if let Some((question_id, _)) = cmd.answers.iter().find(|(id, _)| id.trim().is_empty()) {
            return Err(DomainError::invalid_input(format!(
                "question_id cannot be empty (got {question_id:?})"
            )));
        }
        Ok(vec![SessionEvent::ClarificationsSubmitted(cmd.clone())])
    }

    fn handle_progress(&self, cmd: &RecordProgress) -> Result<Vec<SessionEvent>, DomainError> {
        self.ensure_status(AnalysisStatus::Processing, "record progress on")?;
        if cmd.progress > PROGRESS_COMPLETE {
            return Err(DomainError::invariant("progress cannot exceed 100"));
        }
        if cmd.progress < self.progress {
            return Err(DomainError::invariant(format!(
                "progress cannot go backwards ({} -> {})",
                self.progress, cmd.progress
            )));
        }
        Ok(vec![SessionEvent::ProgressRecorded(cmd.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use implodesc_carbon::CarbonFootprint;
    use implodesc_providers::{AnalysisOutcome, AnalysisProvider, MockGenerator};

    use crate::analysis::SessionMetadata;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn started(item: &str, quantity: u32) -> Session {
        let mut session = Session::empty(SessionId::new());
        session
            .execute(&SessionCommand::Start(StartSession {
                item_name: item.to_string(),
                description: None,
                quantity,
                estimated_completion: now(),
                occurred_at: now(),
            }))
            .unwrap();
        session
    }

    fn submit(session: &mut Session, answers: &[(&str, &str)]) -> Result<Vec<SessionEvent>, DomainError> {
        session.execute(&SessionCommand::SubmitClarifications(SubmitClarifications {
            answers: answers
                .iter()
                .map(|(q, a)| (q.to_string(), a.to_string()))
                .collect(),
            occurred_at: now(),
        }))
    }

    fn result_for(session: &Session) -> Box<EnrichedAnalysis> {
        let outcome = AnalysisOutcome {
            report: MockGenerator.generate(session.item_name(), 1),
            provider: AnalysisProvider::Mock,
            degraded: false,
            fallback_reason: None,
            parse_tier: None,
        };
        let metadata = SessionMetadata {
            session_id: session.session_id(),
            item_name: session.item_name().to_string(),
            item_description: None,
            quantity: 1,
            analysis_date: now(),
            clarifications_used: session.clarifications().clone(),
        };
        Box::new(EnrichedAnalysis::build(
            outcome,
            CarbonFootprint::zero("test"),
            metadata,
        ))
    }

    #[test]
    fn start_validates_input() {
        let mut session = Session::empty(SessionId::new());
        let blank = SessionCommand::Start(StartSession {
            item_name: "   ".into(),
            description: None,
            quantity: 1,
            estimated_completion: now(),
            occurred_at: now(),
        });
        assert!(matches!(session.execute(&blank), Err(DomainError::InvalidInput(_))));
        assert_eq!(session.version(), 0);

        let zero = SessionCommand::Start(StartSession {
            item_name: "Mug".into(),
            description: None,
            quantity: 0,
            estimated_completion: now(),
            occurred_at: now(),
        });
        assert!(matches!(session.execute(&zero), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn started_session_is_pending() {
        let session = started("  Mug ", 2);
        assert_eq!(session.status(), AnalysisStatus::Pending);
        assert_eq!(session.item_name(), "Mug");
        assert_eq!(session.progress(), 0);
        assert_eq!(session.version(), 1);
        assert_eq!(session.remaining_seconds(), Some(25));
        assert_eq!(session.status_message(), "Analysis is queued and will start shortly");
    }

    #[test]
    fn later_answers_overwrite_earlier_ones() {
        let mut session = started("Mug", 1);
        submit(&mut session, &[("use_case", "Personal use"), ("use_case", "Commercial use")]).unwrap();

        assert_eq!(session.status(), AnalysisStatus::Processing);
        assert_eq!(session.progress(), PROGRESS_CLARIFIED);
        assert_eq!(session.current_step(), STEP_CLARIFICATIONS);
        assert_eq!(session.clarifications().len(), 1);
        assert_eq!(session.clarifications()["use_case"], "Commercial use");
        assert_eq!(session.status_message(), "Analysis in progress: Processing clarifications");
    }

    #[test]
    fn second_submission_is_rejected_by_the_aggregate() {
        let mut session = started("Mug", 1);
        submit(&mut session, &[]).unwrap();
        let err = submit(&mut session, &[("quality", "high")]).unwrap_err();
        assert_eq!(
            err,
            DomainError::AlreadySubmitted {
                status: AnalysisStatus::Processing
            }
        );
        assert!(session.clarifications().is_empty());
    }

    #[test]
    fn progress_is_monotone_and_bounded() {
        let mut session = started("Mug", 1);
        submit(&mut session, &[]).unwrap();

        let record = |progress: u8| {
            SessionCommand::RecordProgress(RecordProgress {
                progress,
                step: "step".into(),
                occurred_at: now(),
            })
        };
        session.execute(&record(50)).unwrap();
        assert!(session.execute(&record(40)).is_err());
        assert!(session.execute(&record(101)).is_err());
        assert_eq!(session.progress(), 50);
        assert_eq!(session.remaining_seconds(), Some(15));
    }

    #[test]
    fn result_is_present_iff_completed() {
        let mut session = started("Mug", 1);
        assert!(session.result().is_none());

        let premature = SessionCommand::Complete {
            result: result_for(&session),
            occurred_at: now(),
        };
        assert!(session.execute(&premature).is_err());
        assert!(session.result().is_none());

        submit(&mut session, &[]).unwrap();
        session
            .execute(&SessionCommand::Complete {
                result: result_for(&session),
                occurred_at: now(),
            })
            .unwrap();

        assert_eq!(session.status(), AnalysisStatus::Completed);
        assert!(session.result().is_some());
        assert_eq!(session.progress(), 100);
        assert_eq!(session.remaining_seconds(), Some(0));
        assert_eq!(session.status_message(), "Analysis completed successfully");
    }

    #[test]
    fn failure_is_terminal_and_reported() {
        let mut session = started("Mug", 1);
        submit(&mut session, &[]).unwrap();
        session
            .execute(&SessionCommand::Fail {
                reason: "boom".into(),
                occurred_at: now(),
            })
            .unwrap();

        assert_eq!(session.status(), AnalysisStatus::Failed);
        assert_eq!(session.current_step(), "Analysis failed: boom");
        assert_eq!(session.status_message(), "Analysis failed: boom");
        assert_eq!(session.remaining_seconds(), None);
        assert!(submit(&mut session, &[]).is_err());
    }

    #[test]
    fn only_terminal_sessions_reopen() {
        let mut session = started("Mug", 1);
        let reopen = SessionCommand::Reopen { occurred_at: now() };
        assert!(session.execute(&reopen).is_err());

        submit(&mut session, &[("quality", "high")]).unwrap();
        session
            .execute(&SessionCommand::Fail {
                reason: "boom".into(),
                occurred_at: now(),
            })
            .unwrap();
        session.execute(&reopen).unwrap();

        assert_eq!(session.status(), AnalysisStatus::Pending);
        assert_eq!(session.failure_reason(), None);
        // Answers survive a reopen so a redo can add to them.
        assert_eq!(session.clarifications()["quality"], "high");
    }

    #[test]
    fn quantity_answer_overrides_start_quantity() {
        let mut session = started("Mug", 2);
        assert_eq!(session.effective_quantity(), 2);

        submit(&mut session, &[("quantity", " 40 ")]).unwrap();
        assert_eq!(session.effective_quantity(), 40);

        let mut other = started("Mug", 3);
        submit(&mut other, &[("quantity", "a few")]).unwrap();
        assert_eq!(other.effective_quantity(), 3);

        let mut zero = started("Mug", 4);
        submit(&mut zero, &[("quantity", "0")]).unwrap();
        assert_eq!(zero.effective_quantity(), 4);
    }

    #[test]
    fn commands_on_unstarted_sessions_are_not_found() {
        let mut session = Session::empty(SessionId::new());
        assert!(matches!(submit(&mut session, &[]), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn remaining_time_boundaries() {
        assert_eq!(remaining_for_progress(90), 5);
        assert_eq!(remaining_for_progress(89), 15);
        assert_eq!(remaining_for_progress(50), 15);
        assert_eq!(remaining_for_progress(49), 25);
        assert_eq!(remaining_for_progress(0), 25);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: remaining time never increases as progress grows.
            #[test]
            fn remaining_time_is_non_increasing(a in 0u8..=100, b in 0u8..=100) {
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(remaining_for_progress(high) <= remaining_for_progress(low));
            }
        }
    }
}
