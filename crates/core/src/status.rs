//! Analysis lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle of an analysis session.
///
/// `Pending → Processing → {Completed, Failed}`. The last two are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Created, waiting for clarifications.
    Pending,
    /// Clarifications received, analysis running.
    Processing,
    /// Analysis finished; a result is stored.
    Completed,
    /// Analysis failed; no result is stored.
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

impl core::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
