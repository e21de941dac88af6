//! Value object trait: equality by value, not identity.
//!
//! Quantities in this system are value objects. A normalized quantity of
//! `2.25` at a quarter-yard increment is the same value wherever it appears;
//! nothing about it refers to a particular line item or bolt of fabric.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one (e.g. re-run normalization) instead of mutating fields.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Yardage {
///     decimal: f64,
///     base_units: i64,
/// }
///
/// impl ValueObject for Yardage {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
