//! Deterministic report generator used when no remote backend is usable.

use implodesc_carbon::{Decimal, TransportMode};
use tracing::info;

use crate::report::{
    CarbonIntensity, CompanyEntry, EnvironmentalImpact, MaterialEntry, ProcessEntry,
    SupplyChainReport, TransportLeg,
};

/// kg CO2e per unit for textile items.
const TEXTILE_FOOTPRINT_MICROS: i64 = 7_000_000;
/// kg CO2e per unit for everything else.
const GENERIC_FOOTPRINT_MICROS: i64 = 6_200_000;

/// Pure function of `(item_name, quantity)`.
#[derive(Debug, Copy, Clone, Default)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn generate(&self, item_name: &str, quantity: u32) -> SupplyChainReport {
        info!(item_name, quantity, "generating deterministic analysis");
        let item = item_name.to_lowercase();
        if item.contains("cotton") || item.contains("t-shirt") {
            textile_chain(item_name, quantity)
        } else {
            generic_chain(item_name, quantity)
        }
    }
}

fn per_unit(micros: i64, quantity: u32) -> Decimal {
    Decimal::from_micros(micros) * Decimal::from(quantity)
}

fn figure(micros: i64) -> Option<Decimal> {
    Some(Decimal::from_micros(micros))
}

fn material(name: &str, kind: &str, regions: &[&str], intensity: CarbonIntensity) -> MaterialEntry {
    MaterialEntry {
        name: name.to_string(),
        kind: kind.to_string(),
        source_regions: regions.iter().map(|r| r.to_string()).collect(),
        carbon_intensity: intensity,
    }
}

fn process(name: &str, kind: &str, energy: &str, location: &str, emissions_micros: i64) -> ProcessEntry {
    ProcessEntry {
        name: name.to_string(),
        kind: kind.to_string(),
        energy_requirement: energy.to_string(),
        location: location.to_string(),
        energy_consumption_kwh: None,
        carbon_emissions: figure(emissions_micros),
    }
}

fn leg(from: &str, to: &str, mode: TransportMode, distance_km: i64, emissions_micros: i64) -> TransportLeg {
    TransportLeg {
        origin: from.to_string(),
        destination: to.to_string(),
        mode,
        distance_km: Some(Decimal::from_int(distance_km)),
        carbon_emissions: figure(emissions_micros),
    }
}

fn company(name: &str, role: &str, region: &str) -> CompanyEntry {
    CompanyEntry {
        name: name.to_string(),
        role: role.to_string(),
        region: region.to_string(),
    }
}

fn textile_chain(item_name: &str, quantity: u32) -> SupplyChainReport {
    SupplyChainReport {
        materials: vec![
            material("Cotton fiber", "raw_material", &["India", "China", "USA", "Brazil"], CarbonIntensity::Medium),
            material("Polyester thread", "component", &["China", "India"], CarbonIntensity::High),
        ],
        processes: vec![
            process("Cotton cultivation", "extraction", "Solar energy, irrigation", "Cotton growing regions", 2_100_000),
            process(
                "Textile manufacturing",
                "manufacturing",
                "Grid electricity, natural gas",
                "China, Bangladesh, Vietnam",
                3_800_000,
            ),
        ],
        transportation: vec![
            leg("Cotton farm", "Textile mill", TransportMode::Truck, 500, 300_000),
            leg("Textile mill", "Distribution center", TransportMode::Ship, 8_000, 800_000),
        ],
        companies: vec![
            company("H&M", "manufacturer", "Global"),
            company("Bangladesh textile mills", "supplier", "Bangladesh"),
        ],
        environmental_impact: EnvironmentalImpact {
            total_carbon_footprint_kg: per_unit(TEXTILE_FOOTPRINT_MICROS, quantity),
            highest_impact_stage: "Textile manufacturing".to_string(),
            improvement_opportunities: vec![
                "Use organic cotton".to_string(),
                "Renewable energy in manufacturing".to_string(),
                "Local sourcing to reduce transportation".to_string(),
            ],
        },
        summary: format!(
            "The supply chain for {item_name} involves cotton cultivation, textile processing, and global distribution. \
             The highest environmental impact comes from energy-intensive textile manufacturing processes."
        ),
    }
}

fn generic_chain(item_name: &str, quantity: u32) -> SupplyChainReport {
    SupplyChainReport {
        materials: vec![material(
            "Primary material",
            "raw_material",
            &["China", "USA", "Germany"],
            CarbonIntensity::Medium,
        )],
        processes: vec![process(
            "Manufacturing",
            "manufacturing",
            "Grid electricity",
            "Industrial regions",
            5_000_000,
        )],
        transportation: vec![leg("Factory", "Distribution", TransportMode::Truck, 1_000, 1_200_000)],
        companies: vec![company("Generic Manufacturer", "manufacturer", "Asia")],
        environmental_impact: EnvironmentalImpact {
            total_carbon_footprint_kg: per_unit(GENERIC_FOOTPRINT_MICROS, quantity),
            highest_impact_stage: "Manufacturing".to_string(),
            improvement_opportunities: vec![
                "Improve energy efficiency".to_string(),
                "Use renewable energy".to_string(),
                "Optimize logistics".to_string(),
            ],
        },
        summary: format!(
            "Supply chain analysis for {item_name} shows typical manufacturing and distribution patterns \
             with opportunities for carbon reduction."
        ),
    }
}
