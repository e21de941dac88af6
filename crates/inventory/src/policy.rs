//! Quantity policy: how finely a variant may be cut and what happens when it
//! runs out.
//!
//! Policies are owned by the catalog and arrive here as JSON metadata on the
//! variant or its parent product. This module only reads them.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use cutstock_core::{DomainError, DomainResult};

use crate::units::{RoundingMode, UnitScale};

/// Metadata key holding the smallest sellable fraction.
pub const MIN_INCREMENT_KEY: &str = "min_increment";
/// Metadata key holding the minimum orderable quantity.
pub const MIN_CUT_KEY: &str = "min_cut";
/// Metadata key holding the rounding mode.
pub const ROUNDING_MODE_KEY: &str = "rounding_mode";
/// Metadata key holding the backorder policy.
pub const BACKORDER_POLICY_KEY: &str = "backorder_policy";

/// Whether a sale may proceed once available-to-sell is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackorderPolicy {
    #[default]
    Deny,
    /// Allowed against a promised ship date (tracked outside this crate).
    AllowDate,
    AllowAny,
}

impl BackorderPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            BackorderPolicy::Deny => "deny",
            BackorderPolicy::AllowDate => "allow_date",
            BackorderPolicy::AllowAny => "allow_any",
        }
    }
}

impl FromStr for BackorderPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(BackorderPolicy::Deny),
            "allow_date" => Ok(BackorderPolicy::AllowDate),
            "allow_any" => Ok(BackorderPolicy::AllowAny),
            other => Err(DomainError::invalid_policy(format!(
                "unknown backorder_policy '{other}'"
            ))),
        }
    }
}

/// Per-variant (or inherited per-product) quantity rules.
///
/// Always valid once constructed: `min_increment` is finite and positive and
/// `min_cut`, when present, is finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantityPolicy {
    min_increment: f64,
    min_cut: Option<f64>,
    rounding_mode: RoundingMode,
    backorder_policy: BackorderPolicy,
}

impl QuantityPolicy {
    /// Policy with the given increment and default rounding/backorder rules.
    pub fn new(min_increment: f64) -> DomainResult<Self> {
        UnitScale::new(min_increment)?;
        Ok(Self {
            min_increment,
            min_cut: None,
            rounding_mode: RoundingMode::default(),
            backorder_policy: BackorderPolicy::default(),
        })
    }

    pub fn with_min_cut(mut self, min_cut: f64) -> DomainResult<Self> {
        if !min_cut.is_finite() || min_cut < 0.0 {
            return Err(DomainError::invalid_policy(format!(
                "min_cut must be a non-negative number (got {min_cut})"
            )));
        }
        self.min_cut = Some(min_cut);
        Ok(self)
    }

    pub fn with_rounding_mode(mut self, mode: RoundingMode) -> Self {
        self.rounding_mode = mode;
        self
    }

    pub fn with_backorder_policy(mut self, policy: BackorderPolicy) -> Self {
        self.backorder_policy = policy;
        self
    }

    pub fn min_increment(&self) -> f64 {
        self.min_increment
    }

    pub fn min_cut(&self) -> Option<f64> {
        self.min_cut
    }

    pub fn rounding_mode(&self) -> RoundingMode {
        self.rounding_mode
    }

    pub fn backorder_policy(&self) -> BackorderPolicy {
        self.backorder_policy
    }

    pub fn scale(&self) -> DomainResult<UnitScale> {
        UnitScale::new(self.min_increment)
    }

    /// Read a policy from a metadata bag.
    ///
    /// Returns `Ok(None)` when the bag carries no `min_increment`; any present
    /// but malformed key is an `InvalidPolicy` error rather than a silent default.
    pub fn from_metadata(metadata: &Map<String, JsonValue>) -> DomainResult<Option<Self>> {
        let Some(min_increment) = read_number(metadata, MIN_INCREMENT_KEY)? else {
            return Ok(None);
        };

        let mut policy = Self::new(min_increment)?;

        if let Some(min_cut) = read_number(metadata, MIN_CUT_KEY)? {
            policy = policy.with_min_cut(min_cut)?;
        }
        if let Some(mode) = read_str(metadata, ROUNDING_MODE_KEY)? {
            policy = policy.with_rounding_mode(mode.parse()?);
        }
        if let Some(backorder) = read_str(metadata, BACKORDER_POLICY_KEY)? {
            policy = policy.with_backorder_policy(backorder.parse()?);
        }

        Ok(Some(policy))
    }

    /// Resolve the effective policy: variant override, else product, else none.
    pub fn resolve(
        variant_metadata: Option<&Map<String, JsonValue>>,
        product_metadata: Option<&Map<String, JsonValue>>,
    ) -> DomainResult<Option<Self>> {
        if let Some(meta) = variant_metadata {
            if let Some(policy) = Self::from_metadata(meta)? {
                return Ok(Some(policy));
            }
        }
        match product_metadata {
            Some(meta) => Self::from_metadata(meta),
            None => Ok(None),
        }
    }

    /// Encode this policy into metadata keys (inverse of [`Self::from_metadata`]).
    pub fn to_metadata(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert(MIN_INCREMENT_KEY.to_string(), JsonValue::from(self.min_increment));
        if let Some(min_cut) = self.min_cut {
            map.insert(MIN_CUT_KEY.to_string(), JsonValue::from(min_cut));
        }
        map.insert(
            ROUNDING_MODE_KEY.to_string(),
            JsonValue::from(self.rounding_mode.as_str()),
        );
        map.insert(
            BACKORDER_POLICY_KEY.to_string(),
            JsonValue::from(self.backorder_policy.as_str()),
        );
        map
    }
}

fn read_number(metadata: &Map<String, JsonValue>, key: &str) -> DomainResult<Option<f64>> {
    match metadata.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| DomainError::invalid_policy(format!("{key} is not representable"))),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            DomainError::invalid_policy(format!("{key} must be numeric (got '{s}')"))
        }),
        Some(other) => Err(DomainError::invalid_policy(format!(
            "{key} must be numeric (got {other})"
        ))),
    }
}

fn read_str<'a>(metadata: &'a Map<String, JsonValue>, key: &str) -> DomainResult<Option<&'a str>> {
    match metadata.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(DomainError::invalid_policy(format!(
            "{key} must be a string (got {other})"
        ))),
    }
}
