//! Unit conversion between decimal quantities and integer base units.
//!
//! A base unit is the smallest sellable fraction implied by a `min_increment`
//! (a quarter-yard for `0.25`). Stock arithmetic happens on integers; decimals
//! only exist at the edges.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use cutstock_core::{DomainError, DomainResult};

/// Tolerance used to accept `round(1 / min_increment)` as an exact factor.
pub const EXACT_FACTOR_TOLERANCE: f64 = 1e-10;

/// Granularity used when `min_increment` has no exact integer reciprocal.
pub const FALLBACK_PRECISION: f64 = 1e-6;

/// Slack applied before ceiling/flooring so already-exact values stay put.
const ROUNDING_TOLERANCE: f64 = 1e-10;

/// Largest factor accepted; beyond this `f64` can no longer hold units exactly.
const MAX_FACTOR: f64 = 1e12;

/// How a decimal quantity is snapped onto the base-unit grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    /// Ceiling.
    Up,
    /// Floor.
    Down,
    /// Round half up.
    #[default]
    Nearest,
}

impl RoundingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundingMode::Up => "up",
            RoundingMode::Down => "down",
            RoundingMode::Nearest => "nearest",
        }
    }
}

impl core::fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundingMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(RoundingMode::Up),
            "down" => Ok(RoundingMode::Down),
            "nearest" => Ok(RoundingMode::Nearest),
            other => Err(DomainError::invalid_policy(format!(
                "unknown rounding_mode '{other}'"
            ))),
        }
    }
}

/// Conversion scale for one `min_increment`.
///
/// Resolving the factor once and reusing it keeps repeated conversions for the
/// same policy consistent with each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    min_increment: f64,
    factor: i64,
}

impl UnitScale {
    pub fn new(min_increment: f64) -> DomainResult<Self> {
        if !min_increment.is_finite() || min_increment <= 0.0 {
            return Err(DomainError::invalid_policy(format!(
                "min_increment must be a positive number (got {min_increment})"
            )));
        }

        let candidate = (1.0 / min_increment).round();
        if candidate > MAX_FACTOR {
            return Err(DomainError::invalid_policy(format!(
                "min_increment {min_increment} is finer than the supported precision"
            )));
        }

        let factor = if candidate >= 1.0
            && (1.0 / candidate - min_increment).abs() < EXACT_FACTOR_TOLERANCE
        {
            candidate as i64
        } else {
            (1.0 / FALLBACK_PRECISION).round() as i64
        };

        Ok(Self {
            min_increment,
            factor,
        })
    }

    pub fn min_increment(&self) -> f64 {
        self.min_increment
    }

    /// Number of base units per whole decimal unit. Always `>= 1`.
    pub fn factor(&self) -> i64 {
        self.factor
    }

    pub fn to_base_units(&self, quantity: f64, mode: RoundingMode) -> DomainResult<i64> {
        if !quantity.is_finite() {
            return Err(DomainError::validation(format!(
                "quantity must be a finite number (got {quantity})"
            )));
        }

        let scaled = quantity * self.factor as f64;
        let units = match mode {
            RoundingMode::Up => (scaled - ROUNDING_TOLERANCE).ceil(),
            RoundingMode::Down => (scaled + ROUNDING_TOLERANCE).floor(),
            RoundingMode::Nearest => (scaled + 0.5).floor(),
        };

        if units.abs() >= i64::MAX as f64 {
            return Err(DomainError::validation(format!(
                "quantity {quantity} is out of range"
            )));
        }
        Ok(units as i64)
    }

    pub fn from_base_units(&self, units: i64) -> f64 {
        units as f64 / self.factor as f64
    }
}

/// Base units per whole decimal unit for `min_increment`.
pub fn get_base_unit_factor(min_increment: f64) -> DomainResult<i64> {
    UnitScale::new(min_increment).map(|scale| scale.factor())
}

/// Convert a decimal quantity to base units, rounding per `mode`.
pub fn to_base_units(quantity: f64, min_increment: f64, mode: RoundingMode) -> DomainResult<i64> {
    UnitScale::new(min_increment)?.to_base_units(quantity, mode)
}

/// Convert base units back to a decimal quantity.
pub fn from_base_units(units: i64, min_increment: f64) -> DomainResult<f64> {
    Ok(UnitScale::new(min_increment)?.from_base_units(units))
}
