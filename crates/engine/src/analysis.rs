//! The enriched analysis result and the pure derivations that build it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use implodesc_carbon::{CarbonFootprint, TransportMode};
use implodesc_core::SessionId;
use implodesc_providers::{AnalysisOutcome, AnalysisProvider, CarbonIntensity, SupplyChainReport};

pub const HIGH_INTENSITY_RECOMMENDATION: &str = "Consider alternative materials with lower carbon intensity";
pub const AIR_FREIGHT_RECOMMENDATION: &str = "Explore surface transportation options to reduce emissions";

const LIMITATIONS: [&str; 3] = [
    "Analysis based on typical industry patterns",
    "Actual values may vary by specific supplier and location",
    "Carbon calculations use average emission factors",
];
const DEGRADED_LIMITATION: &str =
    "The selected AI provider was unavailable; results come from a generic reference model";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            ConfidenceLabel::High
        } else if score >= 0.5 {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub confidence_level: ConfidenceLabel,
    pub confidence_score: f64,
    pub limitations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetadata {
    pub session_id: SessionId,
    pub item_name: String,
    pub item_description: Option<String>,
    pub quantity: u32,
    pub analysis_date: DateTime<Utc>,
    pub clarifications_used: BTreeMap<String, String>,
}

/// Provider report plus everything the engine derives from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedAnalysis {
    #[serde(flatten)]
    pub report: SupplyChainReport,
    pub carbon_footprint: CarbonFootprint,
    pub provider: AnalysisProvider,
    /// The selected provider failed and the generator stood in.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub session_metadata: SessionMetadata,
    pub key_insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub data_quality: DataQuality,
}

impl EnrichedAnalysis {
    pub fn build(outcome: AnalysisOutcome, footprint: CarbonFootprint, metadata: SessionMetadata) -> Self {
        let key_insights = key_insights(&outcome.report, &footprint);
        let recommendations = recommendations(&outcome.report);
        let data_quality = data_quality(&footprint, outcome.degraded);
        Self {
            report: outcome.report,
            carbon_footprint: footprint,
            provider: outcome.provider,
            degraded: outcome.degraded,
            fallback_reason: outcome.fallback_reason,
            session_metadata: metadata,
            key_insights,
            recommendations,
            data_quality,
        }
    }
}

fn high_intensity_materials(report: &SupplyChainReport) -> usize {
    report
        .materials
        .iter()
        .filter(|m| m.carbon_intensity == CarbonIntensity::High)
        .count()
}

pub fn key_insights(report: &SupplyChainReport, footprint: &CarbonFootprint) -> Vec<String> {
    let mut insights = Vec::new();

    if footprint.total_co2e.is_positive() {
        insights.push(format!(
            "Total carbon footprint: {:.1} kg CO2e",
            footprint.total_co2e.to_f64()
        ));
    }

    let impact = &report.environmental_impact;
    if impact.has_known_stage() {
        insights.push(format!(
            "Highest environmental impact stage: {}",
            impact.highest_impact_stage
        ));
    }

    let high = high_intensity_materials(report);
    if high > 0 {
        insights.push(format!("High carbon intensity materials identified: {high} materials"));
    }

    insights
}

pub fn recommendations(report: &SupplyChainReport) -> Vec<String> {
    let mut recommendations = report.environmental_impact.improvement_opportunities.clone();

    if high_intensity_materials(report) > 0 {
        recommendations.push(HIGH_INTENSITY_RECOMMENDATION.to_string());
    }
    if report
        .transportation
        .iter()
        .any(|leg| leg.mode == TransportMode::Air)
    {
        recommendations.push(AIR_FREIGHT_RECOMMENDATION.to_string());
    }

    recommendations
}

pub fn data_quality(footprint: &CarbonFootprint, degraded: bool) -> DataQuality {
    let mut limitations: Vec<String> = LIMITATIONS.iter().map(|l| l.to_string()).collect();
    if degraded {
        limitations.push(DEGRADED_LIMITATION.to_string());
    }
    DataQuality {
        confidence_level: ConfidenceLabel::from_score(footprint.confidence_level),
        confidence_score: footprint.confidence_level,
        limitations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use implodesc_carbon::Decimal;
    use implodesc_providers::{MaterialEntry, MockGenerator, TransportLeg};

    fn footprint(total: &str, confidence: f64) -> CarbonFootprint {
        CarbonFootprint::new(total.parse().unwrap(), "test", confidence)
    }

    #[test]
    fn insights_cover_total_stage_and_high_materials() {
        let report = MockGenerator.generate("Cotton T-Shirt", 1);
        let insights = key_insights(&report, &footprint("6.048", 0.5));
        assert_eq!(
            insights,
            vec![
                "Total carbon footprint: 6.0 kg CO2e".to_string(),
                "Highest environmental impact stage: Textile manufacturing".to_string(),
                "High carbon intensity materials identified: 1 materials".to_string(),
            ]
        );
    }

    #[test]
    fn empty_report_has_no_insights() {
        let report = SupplyChainReport::wrap_text("prose");
        assert!(key_insights(&report, &footprint("0", 0.0)).is_empty());
        assert!(recommendations(&report).is_empty());
    }

    #[test]
    fn recommendations_append_heuristics_after_provider_opportunities() {
        let mut report = MockGenerator.generate("Widget", 1);
        report.materials.push(MaterialEntry {
            name: "Aluminium casing".into(),
            carbon_intensity: CarbonIntensity::High,
            ..MaterialEntry::default()
        });
        report.transportation.push(TransportLeg {
            origin: "Factory".into(),
            destination: "Retailer".into(),
            mode: TransportMode::Air,
            distance_km: Some(Decimal::from_int(9_000)),
            carbon_emissions: None,
        });

        let recs = recommendations(&report);

        assert_eq!(
            recs,
            vec![
                "Improve energy efficiency".to_string(),
                "Use renewable energy".to_string(),
                "Optimize logistics".to_string(),
                HIGH_INTENSITY_RECOMMENDATION.to_string(),
                AIR_FREIGHT_RECOMMENDATION.to_string(),
            ]
        );
    }

    #[test]
    fn confidence_label_thresholds() {
        assert_eq!(ConfidenceLabel::from_score(0.75), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(0.74), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(0.5), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(0.49), ConfidenceLabel::Low);
    }

    #[test]
    fn degraded_results_carry_an_extra_limitation() {
        let normal = data_quality(&footprint("1", 0.8), false);
        let degraded = data_quality(&footprint("1", 0.8), true);
        assert_eq!(normal.limitations.len(), 3);
        assert_eq!(degraded.limitations.len(), 4);
        assert_eq!(degraded.confidence_level, ConfidenceLabel::High);
    }
}
