//! Conversions from physical quantities to footprint estimates.
//!
//! Confidence levels are fixed per estimation branch:
//!
//! | branch | confidence |
//! |---|---|
//! | custom factor | `1 - uncertainty` |
//! | material-declared intensity | 0.8 |
//! | table / generic factor | 0.6 |
//! | transport | 0.8 |
//! | process | 0.7 |

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::factor::{EmissionFactor, TransportMode, materials, process};
use crate::footprint::{CarbonFootprint, Scope};

pub const MATERIAL_SPECIFIC_CONFIDENCE: f64 = 0.8;
pub const TABLE_DEFAULT_CONFIDENCE: f64 = 0.6;
pub const TRANSPORT_CONFIDENCE: f64 = 0.8;
pub const PROCESS_CONFIDENCE: f64 = 0.7;

/// A material whose production emissions are estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Declared kg CO2e per unit, if the material carries its own figure.
    #[serde(default)]
    pub carbon_intensity: Option<Decimal>,
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            carbon_intensity: None,
        }
    }

    pub fn with_intensity(mut self, intensity: Decimal) -> Self {
        self.carbon_intensity = Some(intensity);
        self
    }
}

/// Resource consumption of a process step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInput {
    pub name: String,
    #[serde(default)]
    pub energy_consumption_kwh: Option<Decimal>,
    #[serde(default)]
    pub water_consumption_liters: Option<Decimal>,
}

/// Material production emissions, recorded entirely under scope 3.
///
/// Factor priority: `custom` → the material's declared intensity → keyword
/// lookup in the material table (which ends in the generic factor).
pub fn estimate_material_emissions(
    material: &Material,
    quantity: Decimal,
    custom: Option<&EmissionFactor>,
) -> CarbonFootprint {
    let (factor, methodology, confidence) = match (custom, material.carbon_intensity) {
        (Some(custom), _) => (
            custom.factor,
            format!("Custom factor: {}", custom.source),
            1.0 - custom.uncertainty.unwrap_or(0.0),
        ),
        (None, Some(intensity)) => (
            intensity,
            "Material-specific carbon intensity".to_string(),
            MATERIAL_SPECIFIC_CONFIDENCE,
        ),
        (None, None) => {
            let reference = materials::for_name(&material.name);
            (
                reference.factor,
                format!("Default emission factor: {}", reference.source),
                TABLE_DEFAULT_CONFIDENCE,
            )
        }
    };

    let total = quantity * factor;
    CarbonFootprint::new(total, methodology, confidence).with_scope(Scope::Scope3, total)
}

/// Freight emissions: `distance × weight × factor(mode)`, scope 3.
pub fn estimate_transport_emissions(
    mode: TransportMode,
    distance_km: Decimal,
    weight_tonnes: Decimal,
) -> CarbonFootprint {
    let factor = mode.factor();
    let total = distance_km * weight_tonnes * factor.factor;
    CarbonFootprint::new(
        total,
        format!("Transport emission factor: {}", factor.source),
        TRANSPORT_CONFIDENCE,
    )
    .with_scope(Scope::Scope3, total)
}

/// Process emissions: energy (scope 2) plus water treatment (scope 3).
///
/// A term is left out entirely when its consumption figure is absent.
pub fn estimate_process_emissions(
    input: &ProcessInput,
    electricity: Option<&EmissionFactor>,
) -> CarbonFootprint {
    let mut footprint = CarbonFootprint::zero("Process-based calculation");
    footprint.confidence_level = PROCESS_CONFIDENCE;

    if let Some(kwh) = input.energy_consumption_kwh {
        let grid = electricity.unwrap_or(&process::ELECTRICITY_GRID_US);
        let energy = kwh * grid.factor;
        footprint.total_co2e += energy;
        footprint = footprint
            .with_scope(Scope::Scope2, energy)
            .with_breakdown("energy", energy);
    }

    if let Some(liters) = input.water_consumption_liters {
        let water = liters * process::WATER_TREATMENT.factor;
        footprint.total_co2e += water;
        footprint = footprint
            .with_scope(Scope::Scope3, water)
            .with_breakdown("water", water);
    }

    footprint
}
