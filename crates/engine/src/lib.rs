//! `implodesc-engine`
//!
//! **Responsibility:** the analysis orchestration engine.
//!
//! - `session`: the session aggregate (state machine, pure decisions).
//! - `store`: bounded in-memory session map with per-session run locks.
//! - `footprints` / `analysis`: turning a provider report into an enriched result.
//! - `engine`: the facade the transport layer calls.
//!
//! The engine is an explicitly constructed value; there is no global instance.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod footprints;
pub mod session;
pub mod store;

pub use analysis::{ConfidenceLabel, DataQuality, EnrichedAnalysis, SessionMetadata};
pub use config::{ConfigError, EngineConfig, ResubmissionPolicy};
pub use engine::{
    AnalysisEngine, AnalysisResultView, ClarificationAnswer, StartedAnalysis, StatusView,
    SubmittedClarifications,
};
pub use session::{Session, SessionCommand, SessionEvent};
pub use store::SessionStore;
