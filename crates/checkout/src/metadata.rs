//! Line-item metadata side channel.
//!
//! The cart store keeps an arbitrary JSON object on every line item. This crate
//! owns exactly one key of it (`reservation_id`); every write merges into the
//! existing object so keys written by other parts of the system survive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use cutstock_core::ReservationId;

/// Metadata key carrying the ledger reservation held for a line item.
pub const RESERVATION_ID_KEY: &str = "reservation_id";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemMetadata(Map<String, JsonValue>);

impl LineItemMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, JsonValue> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// The recorded reservation, if any. Blank or non-string values count as none.
    pub fn reservation_id(&self) -> Option<ReservationId> {
        match self.0.get(RESERVATION_ID_KEY) {
            Some(JsonValue::String(s)) if !s.trim().is_empty() => Some(ReservationId::new(s.clone())),
            _ => None,
        }
    }

    /// Copy with `reservation_id` set, all other keys kept.
    pub fn with_reservation_id(&self, id: &ReservationId) -> Self {
        let mut next = self.clone();
        next.0.insert(
            RESERVATION_ID_KEY.to_string(),
            JsonValue::String(id.as_str().to_string()),
        );
        next
    }

    /// Copy with `reservation_id` removed, all other keys kept.
    pub fn without_reservation_id(&self) -> Self {
        let mut next = self.clone();
        next.0.remove(RESERVATION_ID_KEY);
        next
    }

    /// Copy with `patch` merged over this metadata (patch wins on conflicts).
    pub fn merge(&self, patch: &LineItemMetadata) -> Self {
        let mut next = self.clone();
        for (key, value) in &patch.0 {
            next.0.insert(key.clone(), value.clone());
        }
        next
    }
}

impl From<Map<String, JsonValue>> for LineItemMetadata {
    fn from(value: Map<String, JsonValue>) -> Self {
        Self(value)
    }
}
