//! `implodesc-carbon`
//!
//! **Responsibility:** the emission model and the carbon aggregator.
//!
//! - `decimal`: fixed-point quantities (factors are multipliers, not display floats).
//! - `factor`: static, versioned reference tables.
//! - `estimate`: quantity → footprint conversions.
//! - `aggregate`: confidence-weighted combination of footprints.
//!
//! Everything here is pure and deterministic.

pub mod aggregate;
pub mod decimal;
pub mod estimate;
pub mod factor;
pub mod footprint;

pub use aggregate::aggregate;
pub use decimal::{Decimal, DecimalError};
pub use estimate::{
    Material, ProcessInput, estimate_material_emissions, estimate_process_emissions,
    estimate_transport_emissions,
};
pub use factor::{EmissionFactor, TransportMode};
pub use footprint::{CarbonFootprint, Scope};
