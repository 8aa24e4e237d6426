//! Value object trait: equality by value, not identity.

/// Marker trait for immutable values compared by their attributes
/// (a rating score, a rental code).
///
/// To "modify" a value object, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
