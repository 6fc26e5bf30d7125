use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use implodesc_core::{AnalysisStatus, SessionId};
use implodesc_engine::{ClarificationAnswer, StartedAnalysis, SubmittedClarifications};
use implodesc_providers::{ClarificationQuestion, ProviderKind};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StartAnalysisRequest {
    pub query: ItemQuery,
}

#[derive(Debug, Deserialize)]
pub struct SubmitClarificationsRequest {
    pub session_id: String,
    #[serde(default)]
    pub clarifications: Vec<ClarificationAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct SetCredentialsRequest {
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct ProvidersQuery {
    pub session_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct StartAnalysisResponse {
    pub session_id: SessionId,
    pub clarifications: Vec<ClarificationQuestion>,
    pub message: String,
}

impl From<StartedAnalysis> for StartAnalysisResponse {
    fn from(started: StartedAnalysis) -> Self {
        Self {
            session_id: started.session_id,
            clarifications: started.questions,
            message: started.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitClarificationsResponse {
    pub session_id: SessionId,
    pub status: AnalysisStatus,
    /// Seconds.
    pub estimated_completion_time: u64,
    pub message: String,
}

impl From<SubmittedClarifications> for SubmitClarificationsResponse {
    fn from(submitted: SubmittedClarifications) -> Self {
        Self {
            session_id: submitted.session_id,
            status: submitted.status,
            estimated_completion_time: submitted.estimated_completion_seconds,
            message: submitted.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SetCredentialsResponse {
    pub session_id: SessionId,
    pub accepted: Vec<ProviderKind>,
    pub message: String,
}
