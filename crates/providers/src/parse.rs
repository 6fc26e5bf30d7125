//! Three-tier parsing of model output into a [`SupplyChainReport`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::report::SupplyChainReport;

/// How a report was recovered from raw model output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseTier {
    /// The whole response was the JSON document.
    Direct,
    /// JSON was found inside a fenced code block.
    Fenced,
    /// No JSON; the raw text became the summary.
    Wrapped,
}

static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n[ \t]*```").ok());

/// Parse model output, never failing.
///
/// 1. the whole text as JSON;
/// 2. the first fenced block (```` ```json ```` or bare ```` ``` ````) that parses;
/// 3. the raw text wrapped as the summary of an otherwise empty report.
pub fn parse_report(raw: &str) -> (SupplyChainReport, ParseTier) {
    if let Ok(report) = serde_json::from_str::<SupplyChainReport>(raw.trim()) {
        return (report, ParseTier::Direct);
    }

    if let Some(re) = FENCED_BLOCK.as_ref() {
        let fenced = re
            .captures_iter(raw)
            .filter_map(|caps| caps.get(1))
            .find_map(|block| serde_json::from_str::<SupplyChainReport>(block.as_str()).ok());
        if let Some(report) = fenced {
            return (report, ParseTier::Fenced);
        }
    }

    (SupplyChainReport::wrap_text(raw), ParseTier::Wrapped)
}
