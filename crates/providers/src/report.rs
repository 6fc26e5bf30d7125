//! The supply-chain report returned by every backend.
//!
//! Model output is loosely shaped, so every field has a default and numeric
//! fields accept numbers, numeric strings, or strings with a leading number
//! (`"2.1 kg"`). Anything unreadable becomes absent instead of failing the
//! whole report.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use implodesc_carbon::{Decimal, TransportMode};

/// Stage name reported when the highest-impact stage is not known.
pub const UNKNOWN_STAGE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SupplyChainReport {
    #[serde(default)]
    pub materials: Vec<MaterialEntry>,
    #[serde(default)]
    pub processes: Vec<ProcessEntry>,
    #[serde(default)]
    pub transportation: Vec<TransportLeg>,
    #[serde(default)]
    pub companies: Vec<CompanyEntry>,
    #[serde(default)]
    pub environmental_impact: EnvironmentalImpact,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
}

impl SupplyChainReport {
    /// Raw text kept as the summary, everything else empty.
    pub fn wrap_text(text: impl Into<String>) -> Self {
        Self {
            summary: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarbonIntensity {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// `raw_material`, `component` or `assembly`.
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub source_regions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_intensity")]
    pub carbon_intensity: CarbonIntensity,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub energy_requirement: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: String,
    /// kWh per unit, when the provider can put a number on it.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub energy_consumption_kwh: Option<Decimal>,
    /// kg CO2e per unit, as reported.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub carbon_emissions: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportLeg {
    #[serde(rename = "from", default, deserialize_with = "lenient_string")]
    pub origin: String,
    #[serde(rename = "to", default, deserialize_with = "lenient_string")]
    pub destination: String,
    #[serde(default = "default_mode", deserialize_with = "lenient_mode")]
    pub mode: TransportMode,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub distance_km: Option<Decimal>,
    /// kg CO2e per unit, as reported.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub carbon_emissions: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalImpact {
    #[serde(default, deserialize_with = "lenient_total")]
    pub total_carbon_footprint_kg: Decimal,
    #[serde(default = "unknown_stage", deserialize_with = "lenient_stage")]
    pub highest_impact_stage: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub improvement_opportunities: Vec<String>,
}

impl Default for EnvironmentalImpact {
    fn default() -> Self {
        Self {
            total_carbon_footprint_kg: Decimal::ZERO,
            highest_impact_stage: unknown_stage(),
            improvement_opportunities: Vec::new(),
        }
    }
}

impl EnvironmentalImpact {
    pub fn has_known_stage(&self) -> bool {
        !self.highest_impact_stage.trim().is_empty()
            && !self.highest_impact_stage.eq_ignore_ascii_case(UNKNOWN_STAGE)
    }
}

fn default_mode() -> TransportMode {
    TransportMode::Other
}

fn unknown_stage() -> String {
    UNKNOWN_STAGE.to_string()
}

/// Leading numeric part of a value: `2.1`, `"2.1"`, `"1,200 km"`.
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

/// First standalone number in `text`; digits glued to a word (`CO2`) don't count.
fn leading_number(text: &str) -> Option<Decimal> {
    let chars: Vec<char> = text.chars().filter(|c| *c != ',').collect();
    let starts_number = |i: usize| {
        chars[i].is_ascii_digit() && (i == 0 || !(chars[i - 1].is_alphanumeric() || chars[i - 1] == '.'))
    };
    let start = (0..chars.len()).find(|&i| starts_number(i))?;
    let negative = start > 0 && chars[start - 1] == '-';
    let digits: String = chars[start..]
        .iter()
        .take_while(|c| c.is_ascii_digit() || **c == '.')
        .collect();
    let digits = digits.trim_end_matches('.');
    let value = digits.parse::<f64>().ok()?;
    Decimal::from_f64(if negative { -value } else { value })
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_string(Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_stage<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_string(Value::deserialize(d)?).unwrap_or_else(unknown_stage))
}

fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items.into_iter().filter_map(value_to_string).collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

fn lenient_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
    Ok(decimal_from_value(&Value::deserialize(d)?))
}

fn lenient_total<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    Ok(decimal_from_value(&Value::deserialize(d)?).unwrap_or(Decimal::ZERO))
}

fn lenient_mode<'de, D: Deserializer<'de>>(d: D) -> Result<TransportMode, D::Error> {
    let mode = value_to_string(Value::deserialize(d)?)
        .map(|s| Value::String(s.trim().to_ascii_lowercase()))
        .and_then(|v| serde_json::from_value(v).ok());
    Ok(mode.unwrap_or(TransportMode::Other))
}

fn lenient_intensity<'de, D: Deserializer<'de>>(d: D) -> Result<CarbonIntensity, D::Error> {
    let intensity = value_to_string(Value::deserialize(d)?)
        .map(|s| Value::String(s.trim().to_ascii_lowercase()))
        .and_then(|v| serde_json::from_value(v).ok());
    Ok(intensity.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let report: SupplyChainReport = serde_json::from_value(json!({"summary": "only text"})).unwrap();
        assert!(report.materials.is_empty());
        assert_eq!(report.environmental_impact.total_carbon_footprint_kg, Decimal::ZERO);
        assert_eq!(report.environmental_impact.highest_impact_stage, "unknown");
        assert!(!report.environmental_impact.has_known_stage());
    }

    #[test]
    fn tolerates_loosely_typed_fields() {
        let report: SupplyChainReport = serde_json::from_value(json!({
            "materials": [{"name": "Steel", "type": "raw_material", "source_regions": "China", "carbon_intensity": "HIGH"}],
            "processes": [
                {"name": "Smelting", "carbon_emissions": "estimated 2.1 kg CO2"},
                {"name": "Rolling", "energy_consumption_kwh": "about 12 kWh"}
            ],
            "transportation": [
                {"from": "Mine", "to": "Mill", "mode": "Ship", "distance_km": "1,200 km", "carbon_emissions": 0.8},
                {"from": "Mill", "to": "Store", "mode": "drone", "distance_km": null}
            ],
            "environmental_impact": {"total_carbon_footprint_kg": "7", "highest_impact_stage": null}
        }))
        .unwrap();

        assert_eq!(report.materials[0].source_regions, vec!["China"]);
        assert_eq!(report.materials[0].carbon_intensity, CarbonIntensity::High);
        assert_eq!(report.processes[0].carbon_emissions, Some(d("2.1")));
        assert_eq!(report.processes[0].energy_consumption_kwh, None);
        assert_eq!(report.processes[1].energy_consumption_kwh, Some(d("12")));
        assert_eq!(report.transportation[0].mode, TransportMode::Ship);
        assert_eq!(report.transportation[0].distance_km, Some(d("1200")));
        assert_eq!(report.transportation[1].mode, TransportMode::Other);
        assert_eq!(report.transportation[1].distance_km, None);
        assert_eq!(report.environmental_impact.total_carbon_footprint_kg, d("7"));
        assert_eq!(report.environmental_impact.highest_impact_stage, "unknown");
    }

    #[test]
    fn text_without_numbers_is_absent() {
        assert_eq!(decimal_from_value(&json!("estimated CO2 kg")), None);
        assert_eq!(decimal_from_value(&json!("-3.5")), Some(d("-3.5")));
        assert_eq!(decimal_from_value(&json!(true)), None);
    }

    #[test]
    fn serializes_wire_field_names() {
        let leg = TransportLeg {
            origin: "Farm".into(),
            destination: "Mill".into(),
            mode: TransportMode::Truck,
            distance_km: Some(d("500")),
            carbon_emissions: None,
        };
        let value = serde_json::to_value(&leg).unwrap();
        assert_eq!(value["from"], "Farm");
        assert_eq!(value["to"], "Mill");
        assert_eq!(value["mode"], "truck");
    }
}
