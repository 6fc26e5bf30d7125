//! `implodesc-core`: shared building blocks for the analysis engine.
//!
//! This crate contains **pure** primitives (no IO, no runtime): identifiers,
//! the error taxonomy, the analysis status, and the aggregate trait used to
//! model state machines.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod status;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult};
pub use id::SessionId;
pub use status::AnalysisStatus;
pub use value_object::ValueObject;
