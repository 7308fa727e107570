//! Dynamic field values exchanged between payloads, filters and storage.
//!
//! # Responsibility
//! - Carry one scalar column value without knowing the target model type.
//! - Convert losslessly to and from SQLite storage values.
//!
//! # Invariants
//! - JSON scalars map onto variants without tags (`true`, `7`, `"a"`).
//! - `Bool` is stored as SQLite `INTEGER` 0/1.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One scalar value for a named model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name used in error messages and log events.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
        }
    }

    /// Reads a boolean, accepting the 0/1 integers SQLite hands back.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Integer(0) => Some(false),
            Self::Integer(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Converts into the SQLite binding representation.
    pub fn to_sql_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Integer(i64::from(*value)),
            Self::Integer(value) => Value::Integer(*value),
            Self::Real(value) => Value::Real(*value),
            Self::Text(value) => Value::Text(value.clone()),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Integer(value) => Self::Integer(value),
            Value::Real(value) => Self::Real(value),
            Value::Text(value) => Self::Text(value),
            // Blobs have no field representation; keep them readable.
            Value::Blob(bytes) => Self::Text(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::FieldValue;
    use rusqlite::types::Value;

    #[test]
    fn json_scalars_deserialize_untagged() {
        let values: Vec<FieldValue> =
            serde_json::from_str(r#"[null, true, 7, 1.5, "a"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue::Null,
                FieldValue::Bool(true),
                FieldValue::Integer(7),
                FieldValue::Real(1.5),
                FieldValue::Text("a".to_string()),
            ]
        );
    }

    #[test]
    fn bool_is_stored_as_integer_and_read_back() {
        let stored = FieldValue::Bool(true).to_sql_value();
        assert_eq!(stored, Value::Integer(1));
        assert_eq!(FieldValue::from(stored).as_bool(), Some(true));
        assert_eq!(FieldValue::Integer(2).as_bool(), None);
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some("x")), FieldValue::from("x"));
    }
}
