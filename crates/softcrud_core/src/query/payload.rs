//! Field update payloads.
//!
//! # Responsibility
//! - Carry a partial `field -> value` update for mutation helpers.
//! - Compose payloads without mutating caller-owned input.
//!
//! # Invariants
//! - Keys are unique; iteration order is key order.
//! - `merged_with` never modifies either operand.

use crate::model::value::FieldValue;
use crate::query::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partial update for one record, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, FieldValue>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Inserts or replaces one field value, returning the previous one.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns a new payload with `overrides` laid over `self`.
    ///
    /// Same-named keys take the value from `overrides`.
    pub fn merged_with(&self, overrides: &Payload) -> Payload {
        let mut merged = self.0.clone();
        for (field, value) in &overrides.0 {
            merged.insert(field.clone(), value.clone());
        }
        Payload(merged)
    }

    /// Parses a JSON object of scalar values.
    ///
    /// # Errors
    /// - `ParseError::Json` when the text is not an object of scalars.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(text).map_err(ParseError::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::Payload;
    use crate::model::value::FieldValue;

    #[test]
    fn merged_with_prefers_overrides_and_keeps_operands() {
        let base = Payload::new().with("removed", false).with("note", "x");
        let overrides = Payload::new().with("removed", true);

        let merged = base.merged_with(&overrides);

        assert_eq!(merged.get("removed"), Some(&FieldValue::Bool(true)));
        assert_eq!(merged.get("note"), Some(&FieldValue::from("x")));
        assert_eq!(base.get("removed"), Some(&FieldValue::Bool(false)));
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn from_json_reads_scalar_object() {
        let payload = Payload::from_json(r#"{"name": "a", "phone": null}"#).unwrap();
        assert_eq!(payload.get("name"), Some(&FieldValue::from("a")));
        assert_eq!(payload.get("phone"), Some(&FieldValue::Null));
        assert!(Payload::from_json("[1, 2]").is_err());
    }
}
