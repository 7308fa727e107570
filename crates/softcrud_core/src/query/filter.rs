//! Filter specifications used to locate a single record.
//!
//! # Responsibility
//! - Model the `[{field: {"$op": value}}]` filter shape as typed clauses.
//! - Parse and render the JSON wire shape.
//!
//! # Invariants
//! - Entry order is preserved. Parsed clauses inside one entry follow key order.
//! - Meaning of composition belongs to the finder interpreting the spec.

use crate::model::field::ID_FIELD;
use crate::model::value::FieldValue;
use crate::query::ParseError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::fmt::{Display, Formatter};

/// Comparison operator inside an operator expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// SQL `LIKE` pattern match; value must be text.
    Like,
    /// `true` matches NULL, `false` matches non-NULL.
    IsNull,
}

impl FilterOp {
    /// Wire name, e.g. `$eq`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Like => "$like",
            Self::IsNull => "$is_null",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "$eq" => Some(Self::Eq),
            "$ne" => Some(Self::Ne),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            "$like" => Some(Self::Like),
            "$is_null" => Some(Self::IsNull),
            _ => None,
        }
    }
}

/// One `field op value` constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

/// One mapping object of the spec; may constrain several fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterEntry {
    clauses: Vec<FilterClause>,
}

impl FilterEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style clause append.
    pub fn with(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.clauses.push(FilterClause {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    fn to_json(&self) -> JsonValue {
        let mut fields = Map::new();
        for clause in &self.clauses {
            let ops = fields
                .entry(clause.field.clone())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if let JsonValue::Object(ops) = ops {
                ops.insert(
                    clause.op.as_str().to_string(),
                    serde_json::to_value(&clause.value).unwrap_or(JsonValue::Null),
                );
            }
        }
        JsonValue::Object(fields)
    }
}

/// Ordered sequence of filter entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    entries: Vec<FilterEntry>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// `[{"id": {"$eq": id}}]`
    pub fn by_id(id: impl Into<FieldValue>) -> Self {
        Self::new().entry(FilterEntry::new().with(ID_FIELD, FilterOp::Eq, id))
    }

    /// Single-clause equality shorthand.
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new().entry(FilterEntry::new().with(field, FilterOp::Eq, value))
    }

    /// Builder-style entry append.
    pub fn entry(mut self, entry: FilterEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    /// All clauses across entries, in order.
    pub fn clauses(&self) -> impl Iterator<Item = &FilterClause> {
        self.entries.iter().flat_map(|entry| entry.clauses.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.clauses().next().is_none()
    }

    /// Parses the JSON wire shape `[{"field": {"$op": value}}]`.
    ///
    /// # Errors
    /// - `ParseError::Json` for malformed JSON.
    /// - `ParseError::Shape` for structurally invalid specs or unknown operators.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        let value: JsonValue = serde_json::from_str(text).map_err(ParseError::Json)?;
        Self::from_json_value(&value)
    }

    /// Parses an already decoded JSON value.
    pub fn from_json_value(value: &JsonValue) -> Result<Self, ParseError> {
        let items = value
            .as_array()
            .ok_or_else(|| ParseError::Shape("filter spec must be an array".to_string()))?;

        let mut spec = Self::new();
        for (index, item) in items.iter().enumerate() {
            let fields = item.as_object().ok_or_else(|| {
                ParseError::Shape(format!("filter entry #{index} must be an object"))
            })?;

            let mut entry = FilterEntry::new();
            for (field, expr) in fields {
                let ops = expr.as_object().ok_or_else(|| {
                    ParseError::Shape(format!(
                        "operator expression for `{field}` must be an object"
                    ))
                })?;
                if ops.is_empty() {
                    return Err(ParseError::Shape(format!(
                        "operator expression for `{field}` is empty"
                    )));
                }
                for (op_name, operand) in ops {
                    let op = FilterOp::parse(op_name).ok_or_else(|| {
                        ParseError::Shape(format!("unknown operator `{op_name}` on `{field}`"))
                    })?;
                    let operand: FieldValue =
                        serde_json::from_value(operand.clone()).map_err(|_| {
                            ParseError::Shape(format!(
                                "operand of `{op_name}` on `{field}` must be a scalar"
                            ))
                        })?;
                    entry = entry.with(field.as_str(), op, operand);
                }
            }
            spec = spec.entry(entry);
        }

        Ok(spec)
    }

    /// Renders the JSON wire shape.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(self.entries.iter().map(FilterEntry::to_json).collect())
    }
}

impl Display for FilterSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for FilterSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Self::from_json_value(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterEntry, FilterOp, FilterSpec};
    use crate::model::value::FieldValue;
    use serde_json::json;

    #[test]
    fn by_id_renders_eq_on_id() {
        let spec = FilterSpec::by_id(7_i64);
        assert_eq!(spec.to_json(), json!([{"id": {"$eq": 7}}]));
        assert_eq!(spec.to_string(), r#"[{"id":{"$eq":7}}]"#);
    }

    #[test]
    fn from_json_keeps_entry_order_and_operators() {
        let spec = FilterSpec::from_json(
            r#"[{"name": {"$like": "a%"}}, {"id": {"$gte": 3, "$lt": 9}}]"#,
        )
        .unwrap();

        let clauses: Vec<_> = spec.clauses().collect();
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0].field, "name");
        assert_eq!(clauses[0].op, FilterOp::Like);
        assert_eq!(clauses[1].op, FilterOp::Gte);
        assert_eq!(clauses[1].value, FieldValue::Integer(3));
        assert_eq!(clauses[2].op, FilterOp::Lt);
    }

    #[test]
    fn from_json_rejects_unknown_operator_and_bad_shapes() {
        assert!(FilterSpec::from_json(r#"[{"id": {"$in": 1}}]"#).is_err());
        assert!(FilterSpec::from_json(r#"{"id": {"$eq": 1}}"#).is_err());
        assert!(FilterSpec::from_json(r#"[{"id": 1}]"#).is_err());
        assert!(FilterSpec::from_json(r#"[{"id": {}}]"#).is_err());
        assert!(FilterSpec::from_json(r#"[{"id": {"$eq": [1]}}]"#).is_err());
    }

    #[test]
    fn serde_roundtrip_through_json_value() {
        let spec = FilterSpec::new()
            .entry(FilterEntry::new().with("removed", FilterOp::Eq, false))
            .entry(FilterEntry::new().with("email", FilterOp::IsNull, true));
        let value = serde_json::to_value(&spec).unwrap();
        let decoded: FilterSpec = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, spec);
    }
}
