//! Quantity normalization.
//!
//! Every requested quantity passes through [`normalize_quantity`] before it is
//! accepted into a cart or turned into a reservation request.

use serde::Serialize;

use cutstock_core::{DomainError, DomainResult, ValueObject};

use crate::policy::QuantityPolicy;
use crate::units::RoundingMode;

/// Slack when comparing a request against `min_cut`.
const MIN_CUT_TOLERANCE: f64 = 1e-12;

/// Differences at or below this are not reported as rounding.
const ROUNDED_TOLERANCE: f64 = 1e-9;

/// A quantity snapped onto its policy's base-unit grid.
///
/// `decimal == base_units / factor`, and `decimal >= min_cut` whenever the
/// policy sets a minimum cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedQuantity {
    decimal: f64,
    base_units: i64,
    was_rounded: bool,
}

impl ValueObject for NormalizedQuantity {}

impl NormalizedQuantity {
    pub fn decimal(&self) -> f64 {
        self.decimal
    }

    pub fn base_units(&self) -> i64 {
        self.base_units
    }

    /// Whether the accepted quantity differs from what was requested.
    pub fn was_rounded(&self) -> bool {
        self.was_rounded
    }
}

/// Validate and round `quantity` according to `policy`.
pub fn normalize_quantity(quantity: f64, policy: &QuantityPolicy) -> DomainResult<NormalizedQuantity> {
    if quantity.is_nan() {
        return Err(DomainError::validation("quantity must be a number"));
    }
    if quantity < 0.0 {
        return Err(DomainError::NegativeQuantity(quantity));
    }
    if let Some(min_cut) = policy.min_cut() {
        if quantity < min_cut - MIN_CUT_TOLERANCE {
            return Err(DomainError::BelowMinimumCut {
                requested: quantity,
                min_cut,
            });
        }
    }

    let scale = policy.scale()?;
    let mut base_units = scale.to_base_units(quantity, policy.rounding_mode())?;

    // Rounding down (or to nearest) may land just under the minimum cut; the
    // smallest grid point at or above the cut is the accepted quantity then.
    if let Some(min_cut) = policy.min_cut() {
        if scale.from_base_units(base_units) < min_cut - MIN_CUT_TOLERANCE {
            base_units = scale.to_base_units(min_cut, RoundingMode::Up)?;
            if scale.from_base_units(base_units) < min_cut - MIN_CUT_TOLERANCE {
                base_units += 1;
            }
        }
    }

    let decimal = scale.from_base_units(base_units);
    Ok(NormalizedQuantity {
        decimal,
        base_units,
        was_rounded: (decimal - quantity).abs() > ROUNDED_TOLERANCE,
    })
}
