//! Fractional-unit inventory policy module.
//!
//! This crate contains the quantity rules for goods sold in cuttable units
//! (fabric by the yard, cable by the metre), implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage):
//!
//! - [`units`]: decimal <-> integer base-unit conversion
//! - [`policy`]: per-variant quantity policy and its metadata encoding
//! - [`normalize`]: the single gate every requested quantity passes through
//! - [`availability`]: available-to-sell, stock status and backorder rules

pub mod availability;
pub mod normalize;
pub mod policy;
pub mod units;

pub use availability::{
    AvailabilityReport, BackorderDecision, StockSnapshot, StockStatus, compute_ats_decimal,
    compute_ats_units, decide_backorder, get_stock_status,
};
pub use normalize::{NormalizedQuantity, normalize_quantity};
pub use policy::{BackorderPolicy, QuantityPolicy};
pub use units::{RoundingMode, UnitScale, from_base_units, get_base_unit_factor, to_base_units};
