//! Available-to-sell (ATS), stock status and backorder rules.
//!
//! All stock arithmetic is done in integer base units; decimals are derived
//! only for display.

use serde::{Deserialize, Serialize};

use cutstock_core::{DomainResult, ValueObject};

use crate::policy::{BackorderPolicy, QuantityPolicy};
use crate::units::{RoundingMode, UnitScale};

/// Reason reported when a backorder is refused.
pub const BACKORDERS_DISABLED: &str = "Backorders disabled";

/// Stock levels for one inventory item, as read from the ledger.
///
/// All values are base units. This crate never mutates a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub stocked_units: i64,
    pub reserved_units: i64,
    #[serde(default)]
    pub incoming_units: i64,
}

impl ValueObject for StockSnapshot {}

impl StockSnapshot {
    pub fn new(stocked_units: i64, reserved_units: i64) -> Self {
        Self {
            stocked_units,
            reserved_units,
            incoming_units: 0,
        }
    }

    pub fn with_incoming(mut self, incoming_units: i64) -> Self {
        self.incoming_units = incoming_units;
        self
    }
}

/// Stock classification shown to buyers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
    /// Reserved for backorder-aware classification; [`get_stock_status`] never returns it.
    Backordered,
}

impl StockStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::InStock => "in_stock",
            StockStatus::Backordered => "backordered",
        }
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying a backorder policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackorderDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BackorderDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// `max(0, stocked - reserved (+ incoming))`, in base units.
pub fn compute_ats_units(snapshot: &StockSnapshot, include_incoming_in_ats: bool) -> i64 {
    let incoming = if include_incoming_in_ats {
        snapshot.incoming_units
    } else {
        0
    };
    snapshot
        .stocked_units
        .saturating_sub(snapshot.reserved_units)
        .saturating_add(incoming)
        .max(0)
}

/// ATS converted to a decimal quantity.
pub fn compute_ats_decimal(
    snapshot: &StockSnapshot,
    include_incoming_in_ats: bool,
    min_increment: f64,
) -> DomainResult<f64> {
    let scale = UnitScale::new(min_increment)?;
    Ok(scale.from_base_units(compute_ats_units(snapshot, include_incoming_in_ats)))
}

/// Classify ATS against a low-stock threshold expressed as a decimal quantity.
pub fn get_stock_status(
    ats_units: i64,
    low_stock_threshold: f64,
    min_increment: f64,
) -> DomainResult<StockStatus> {
    if ats_units <= 0 {
        return Ok(StockStatus::OutOfStock);
    }
    let threshold_units =
        UnitScale::new(min_increment)?.to_base_units(low_stock_threshold, RoundingMode::Nearest)?;
    if ats_units <= threshold_units {
        Ok(StockStatus::LowStock)
    } else {
        Ok(StockStatus::InStock)
    }
}

/// Decide whether a sale may proceed given current ATS.
///
/// Positive ATS never needs a backorder, so it is allowed under every policy.
pub fn decide_backorder(policy: BackorderPolicy, ats_units: i64) -> BackorderDecision {
    if ats_units > 0 {
        return BackorderDecision::allowed();
    }
    match policy {
        BackorderPolicy::Deny => BackorderDecision::denied(BACKORDERS_DISABLED),
        // The ship-date promise is enforced outside this crate.
        BackorderPolicy::AllowDate | BackorderPolicy::AllowAny => BackorderDecision::allowed(),
    }
}

/// Everything a storefront needs to know about one item's availability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityReport {
    pub ats_units: i64,
    pub ats_decimal: f64,
    pub status: StockStatus,
    pub backorder: BackorderDecision,
    pub backorder_policy: BackorderPolicy,
}

impl AvailabilityReport {
    pub fn evaluate(
        snapshot: &StockSnapshot,
        policy: &QuantityPolicy,
        low_stock_threshold: f64,
        include_incoming_in_ats: bool,
    ) -> DomainResult<Self> {
        let ats_units = compute_ats_units(snapshot, include_incoming_in_ats);
        let ats_decimal = compute_ats_decimal(snapshot, include_incoming_in_ats, policy.min_increment())?;
        let status = get_stock_status(ats_units, low_stock_threshold, policy.min_increment())?;
        Ok(Self {
            ats_units,
            ats_decimal,
            status,
            backorder: decide_backorder(policy.backorder_policy(), ats_units),
            backorder_policy: policy.backorder_policy(),
        })
    }

    /// Whether `requested_units` can be sold from stock or on backorder.
    pub fn can_sell(&self, requested_units: i64) -> bool {
        requested_units <= self.ats_units || self.backorder_policy != BackorderPolicy::Deny
    }
}
