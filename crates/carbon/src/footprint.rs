use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use implodesc_core::ValueObject;

use crate::decimal::Decimal;

/// GHG Protocol emission scope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Direct emissions.
    Scope1,
    /// Purchased energy.
    Scope2,
    /// Other indirect emissions.
    Scope3,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Scope1, Scope::Scope2, Scope::Scope3];
}

/// A carbon-footprint estimate (kg CO2e).
///
/// Produced by the emission model or the aggregator; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonFootprint {
    pub total_co2e: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope1: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope2: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope3: Option<Decimal>,
    pub methodology: String,
    /// Confidence in \[0, 1\].
    pub confidence_level: f64,
    /// Named categories (e.g. `energy`, `water`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, Decimal>,
}

impl ValueObject for CarbonFootprint {}

impl CarbonFootprint {
    /// Confidence is clamped into \[0, 1\]; NaN becomes 0.
    pub fn new(total_co2e: Decimal, methodology: impl Into<String>, confidence_level: f64) -> Self {
        Self {
            total_co2e,
            scope1: None,
            scope2: None,
            scope3: None,
            methodology: methodology.into(),
            confidence_level: clamp_confidence(confidence_level),
            breakdown: BTreeMap::new(),
        }
    }

    /// Zero-footprint placeholder.
    pub fn zero(methodology: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, methodology, 0.0)
    }

    pub fn with_scope(mut self, scope: Scope, value: Decimal) -> Self {
        match scope {
            Scope::Scope1 => self.scope1 = Some(value),
            Scope::Scope2 => self.scope2 = Some(value),
            Scope::Scope3 => self.scope3 = Some(value),
        }
        self
    }

    pub fn with_breakdown(mut self, category: impl Into<String>, value: Decimal) -> Self {
        self.breakdown.insert(category.into(), value);
        self
    }

    pub fn scope(&self, scope: Scope) -> Option<Decimal> {
        match scope {
            Scope::Scope1 => self.scope1,
            Scope::Scope2 => self.scope2,
            Scope::Scope3 => self.scope3,
        }
    }
}

pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
