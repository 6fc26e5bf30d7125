//! Emission-factor reference tables.
//!
//! Read-only configuration data: every factor is a `static` with its source and
//! effective year. Tables are versioned through [`REFERENCE_TABLE_VERSION`];
//! bump it whenever a value changes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use implodesc_core::{DomainError, ValueObject};

use crate::decimal::Decimal;

/// Version of the reference tables below.
pub const REFERENCE_TABLE_VERSION: &str = "2023.1";

/// A reference multiplier converting a physical quantity into kg CO2e.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactor {
    pub name: Cow<'static, str>,
    /// kg CO2e per `unit`.
    pub factor: Decimal,
    pub unit: Cow<'static, str>,
    pub source: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Cow<'static, str>>,
    pub year: u16,
    /// Relative uncertainty in \[0, 1\].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<f64>,
}

impl ValueObject for EmissionFactor {}

impl EmissionFactor {
    const fn reference(
        name: &'static str,
        factor: Decimal,
        unit: &'static str,
        source: &'static str,
        year: u16,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            factor,
            unit: Cow::Borrowed(unit),
            source: Cow::Borrowed(source),
            region: None,
            year,
            uncertainty: None,
        }
    }

    const fn regional(
        name: &'static str,
        factor: Decimal,
        unit: &'static str,
        source: &'static str,
        region: &'static str,
        year: u16,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            factor,
            unit: Cow::Borrowed(unit),
            source: Cow::Borrowed(source),
            region: Some(Cow::Borrowed(region)),
            year,
            uncertainty: None,
        }
    }

    /// A caller-supplied factor (e.g. supplier-specific data).
    pub fn custom(
        name: impl Into<String>,
        factor: Decimal,
        unit: impl Into<String>,
        source: impl Into<String>,
        year: u16,
    ) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            factor,
            unit: Cow::Owned(unit.into()),
            source: Cow::Owned(source.into()),
            region: None,
            year,
            uncertainty: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(Cow::Owned(region.into()));
        self
    }

    pub fn with_uncertainty(mut self, uncertainty: f64) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&uncertainty) {
            return Err(DomainError::invalid_input(format!(
                "uncertainty must be within [0, 1], got {uncertainty}"
            )));
        }
        self.uncertainty = Some(uncertainty);
        Ok(self)
    }
}

/// Material production factors (kg CO2e/kg).
pub mod materials {
    use super::*;

    pub static STEEL: EmissionFactor = EmissionFactor::reference(
        "Steel",
        Decimal::from_micros(1_850_000),
        "kg CO2e/kg",
        "DEFRA 2023",
        2023,
    );

    pub static ALUMINUM: EmissionFactor = EmissionFactor::reference(
        "Aluminum",
        Decimal::from_micros(8_240_000),
        "kg CO2e/kg",
        "DEFRA 2023",
        2023,
    );

    pub static PLASTIC_PET: EmissionFactor = EmissionFactor::reference(
        "PET Plastic",
        Decimal::from_micros(2_150_000),
        "kg CO2e/kg",
        "DEFRA 2023",
        2023,
    );

    pub static COTTON: EmissionFactor = EmissionFactor::reference(
        "Cotton",
        Decimal::from_micros(5_890_000),
        "kg CO2e/kg",
        "Textile Exchange 2023",
        2023,
    );

    pub static CONCRETE: EmissionFactor = EmissionFactor::reference(
        "Concrete",
        Decimal::from_micros(130_000),
        "kg CO2e/kg",
        "DEFRA 2023",
        2023,
    );

    /// Used when a material name matches nothing in the table.
    pub static GENERIC_MANUFACTURING: EmissionFactor = EmissionFactor::reference(
        "Generic manufactured material",
        Decimal::from_micros(2_000_000),
        "kg CO2e/kg",
        "Generic manufacturing average",
        2023,
    );

    /// Keyword lookup against the material table; first match wins.
    pub fn for_name(name: &str) -> &'static EmissionFactor {
        let name = name.to_lowercase();
        if name.contains("steel") {
            &STEEL
        } else if name.contains("aluminum") || name.contains("aluminium") {
            &ALUMINUM
        } else if name.contains("plastic") || name.contains("pet") {
            &PLASTIC_PET
        } else if name.contains("cotton") {
            &COTTON
        } else if name.contains("concrete") {
            &CONCRETE
        } else {
            &GENERIC_MANUFACTURING
        }
    }
}

/// Freight factors (kg CO2e per km per tonne).
pub mod transport {
    use super::*;

    pub static TRUCK_DIESEL: EmissionFactor = EmissionFactor::reference(
        "Truck (Diesel)",
        Decimal::from_micros(120_000),
        "kg CO2e/km/tonne",
        "DEFRA 2023",
        2023,
    );

    pub static RAIL_FREIGHT: EmissionFactor = EmissionFactor::reference(
        "Rail Freight",
        Decimal::from_micros(28_000),
        "kg CO2e/km/tonne",
        "DEFRA 2023",
        2023,
    );

    pub static SHIP_CONTAINER: EmissionFactor = EmissionFactor::reference(
        "Container Ship",
        Decimal::from_micros(11_000),
        "kg CO2e/km/tonne",
        "IMO 2021",
        2021,
    );

    pub static AIR_FREIGHT: EmissionFactor = EmissionFactor::reference(
        "Air Freight",
        Decimal::from_micros(602_000),
        "kg CO2e/km/tonne",
        "DEFRA 2023",
        2023,
    );
}

/// Process energy and water factors.
pub mod process {
    use super::*;

    pub static ELECTRICITY_GRID_US: EmissionFactor = EmissionFactor::regional(
        "US Grid Electricity",
        Decimal::from_micros(386_000),
        "kg CO2e/kWh",
        "EPA eGRID 2022",
        "United States",
        2022,
    );

    pub static NATURAL_GAS: EmissionFactor = EmissionFactor::reference(
        "Natural Gas Combustion",
        Decimal::from_micros(184_000),
        "kg CO2e/kWh",
        "EPA 2023",
        2023,
    );

    pub static WATER_TREATMENT: EmissionFactor = EmissionFactor::reference(
        "Water Treatment",
        Decimal::from_micros(149),
        "kg CO2e/liter",
        "DEFRA 2023",
        2023,
    );
}

/// Freight transport mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Truck,
    Rail,
    Ship,
    Air,
    Pipeline,
    /// Anything a provider reports that is not one of the above.
    #[serde(other)]
    Other,
}

impl TransportMode {
    /// Reference factor for the mode. Modes without a dedicated factor use
    /// the truck/diesel factor.
    pub fn factor(self) -> &'static EmissionFactor {
        match self {
            TransportMode::Rail => &transport::RAIL_FREIGHT,
            TransportMode::Ship => &transport::SHIP_CONTAINER,
            TransportMode::Air => &transport::AIR_FREIGHT,
            TransportMode::Truck | TransportMode::Pipeline | TransportMode::Other => {
                &transport::TRUCK_DIESEL
            }
        }
    }
}
