//! Checkout configuration loading.

use cutstock_core::LocationId;

/// Environment variable naming the stock location used when a checkout does not pick one.
pub const ENV_DEFAULT_LOCATION_ID: &str = "CUTSTOCK_DEFAULT_LOCATION_ID";
/// Environment variable holding the low-stock threshold (decimal quantity).
pub const ENV_LOW_STOCK_THRESHOLD: &str = "CUTSTOCK_LOW_STOCK_THRESHOLD";
/// Environment variable toggling incoming stock in ATS.
pub const ENV_INCLUDE_INCOMING_IN_ATS: &str = "CUTSTOCK_INCLUDE_INCOMING_IN_ATS";

const DEFAULT_LOW_STOCK_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutConfig {
    pub default_location_id: Option<LocationId>,
    /// Decimal quantity at or below which an item is reported as low stock.
    pub low_stock_threshold: f64,
    pub include_incoming_in_ats: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            default_location_id: None,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            include_incoming_in_ats: false,
        }
    }
}

impl CheckoutConfig {
    /// Load from process environment, falling back to defaults per key.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Malformed values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DEFAULT_LOCATION_ID) {
            match raw.parse::<LocationId>() {
                Ok(id) => config.default_location_id = Some(id),
                Err(_) => tracing::warn!(
                    key = ENV_DEFAULT_LOCATION_ID,
                    "empty location id; no default location"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_LOW_STOCK_THRESHOLD) {
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => config.low_stock_threshold = v,
                _ => tracing::warn!(
                    key = ENV_LOW_STOCK_THRESHOLD,
                    value = %raw,
                    "invalid low stock threshold; using default"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_INCLUDE_INCOMING_IN_ATS) {
            match parse_flag(&raw) {
                Some(flag) => config.include_incoming_in_ats = flag,
                None => tracing::warn!(
                    key = ENV_INCLUDE_INCOMING_IN_ATS,
                    value = %raw,
                    "invalid boolean; using default"
                ),
            }
        }

        config
    }

    pub fn with_default_location(mut self, location_id: LocationId) -> Self {
        self.default_location_id = Some(location_id);
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = CheckoutConfig::from_lookup(|_| None);
        assert_eq!(config, CheckoutConfig::default());
        assert_eq!(config.low_stock_threshold, 1.0);
        assert!(!config.include_incoming_in_ats);
    }

    #[test]
    fn reads_all_keys() {
        let config = CheckoutConfig::from_lookup(lookup(&[
            (ENV_DEFAULT_LOCATION_ID, "loc_warehouse"),
            (ENV_LOW_STOCK_THRESHOLD, "2.5"),
            (ENV_INCLUDE_INCOMING_IN_ATS, "yes"),
        ]));
        assert_eq!(config.default_location_id, Some(LocationId::new("loc_warehouse")));
        assert_eq!(config.low_stock_threshold, 2.5);
        assert!(config.include_incoming_in_ats);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let config = CheckoutConfig::from_lookup(lookup(&[
            (ENV_DEFAULT_LOCATION_ID, "  "),
            (ENV_LOW_STOCK_THRESHOLD, "-1"),
            (ENV_INCLUDE_INCOMING_IN_ATS, "maybe"),
        ]));
        assert_eq!(config, CheckoutConfig::default());
    }
}
