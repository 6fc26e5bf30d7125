//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: a carbon
/// quantity or an emission estimate has no identity of its own. To "modify"
/// one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
