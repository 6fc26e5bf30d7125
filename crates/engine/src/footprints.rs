//! Footprint derivation from a provider report.
//!
//! Materials are estimated with the emission model: the shipment mass is split
//! evenly across the reported materials and priced with each material's
//! reference factor. Transport legs with a distance, and processes with an
//! energy figure, are modelled as well.
//! Figures the provider reported itself (per unit) are scaled by quantity and
//! kept at lower confidence. The report's headline total is used only when
//! nothing else can be derived.

use implodesc_carbon::{
    CarbonFootprint, Decimal, Material, ProcessInput, Scope, estimate_material_emissions,
    estimate_process_emissions, estimate_transport_emissions,
};
use implodesc_providers::SupplyChainReport;

pub const REPORTED_CONFIDENCE: f64 = 0.5;
pub const HEADLINE_CONFIDENCE: f64 = 0.4;

const REPORTED_METHODOLOGY: &str = "Provider-reported estimate";
const HEADLINE_METHODOLOGY: &str = "Provider headline estimate";

const KG_PER_TONNE: Decimal = Decimal::from_micros(1_000_000_000);

pub fn report_footprints(
    report: &SupplyChainReport,
    quantity: u32,
    unit_weight_tonnes: Decimal,
) -> Vec<CarbonFootprint> {
    let quantity = Decimal::from(quantity);
    let shipment_weight = quantity * unit_weight_tonnes;
    let mut footprints = Vec::new();

    let named: Vec<&str> = report
        .materials
        .iter()
        .map(|m| m.name.trim())
        .filter(|name| !name.is_empty())
        .collect();
    let material_mass_kg = (shipment_weight * KG_PER_TONNE).split(named.len());
    footprints.extend(
        named
            .into_iter()
            .map(|name| estimate_material_emissions(&Material::named(name), material_mass_kg, None)),
    );

    for leg in &report.transportation {
        match (leg.distance_km.filter(|d| d.is_positive()), reported(leg.carbon_emissions)) {
            (Some(distance), _) => {
                footprints.push(estimate_transport_emissions(leg.mode, distance, shipment_weight));
            }
            (None, Some(per_unit)) => footprints.push(provider_reported(per_unit * quantity)),
            (None, None) => {}
        }
    }

    for process in &report.processes {
        match (process.energy_consumption_kwh.filter(|kwh| kwh.is_positive()), reported(process.carbon_emissions)) {
            (Some(kwh), _) => footprints.push(estimate_process_emissions(
                &ProcessInput {
                    name: process.name.clone(),
                    energy_consumption_kwh: Some(kwh * quantity),
                    water_consumption_liters: None,
                },
                None,
            )),
            (None, Some(per_unit)) => footprints.push(provider_reported(per_unit * quantity)),
            (None, None) => {}
        }
    }

    let headline = report.environmental_impact.total_carbon_footprint_kg;
    if footprints.is_empty() && headline.is_positive() {
        footprints.push(CarbonFootprint::new(headline, HEADLINE_METHODOLOGY, HEADLINE_CONFIDENCE));
    }

    footprints
}

fn reported(figure: Option<Decimal>) -> Option<Decimal> {
    figure.filter(|f| *f >= Decimal::ZERO)
}

fn provider_reported(total: Decimal) -> CarbonFootprint {
    CarbonFootprint::new(total, REPORTED_METHODOLOGY, REPORTED_CONFIDENCE).with_scope(Scope::Scope3, total)
}
