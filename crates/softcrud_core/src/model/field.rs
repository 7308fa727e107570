//! Model field contracts and mutation whitelists.
//!
//! # Responsibility
//! - Define the accessor surface a model type exposes to generic helpers.
//! - Gate which named fields a mutation is allowed to assign.
//!
//! # Invariants
//! - `Model::columns()` lists every field `get`/`set` understands, and
//!   always contains `id`.
//! - A `FieldWhitelist<M>` only ever holds names from `M::columns()`.
//! - Setters never partially assign: a rejected value leaves the field as is.

use crate::model::value::FieldValue;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

/// Identifier column every model is addressed by.
pub const ID_FIELD: &str = "id";
/// Soft-delete marker column.
pub const REMOVED_FIELD: &str = "removed";
/// Soft-delete timestamp column (UTC epoch milliseconds).
pub const REMOVED_AT_FIELD: &str = "removed_at";

/// Field-level assignment error.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The model has no field with this name.
    UnknownField { table: &'static str, field: String },
    /// The value cannot be stored in the named field.
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl FieldError {
    /// Builds a type mismatch error for `field` from the rejected value.
    pub fn mismatch(field: &str, expected: &'static str, found: &FieldValue) -> Self {
        Self::TypeMismatch {
            field: field.to_string(),
            expected,
            found: found.type_name(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { table, field } => {
                write!(f, "unknown field `{field}` on `{table}`")
            }
            Self::TypeMismatch {
                field,
                expected,
                found,
            } => write!(f, "field `{field}` expects {expected}, got {found}"),
        }
    }
}

impl Error for FieldError {}

/// Accessor contract for a persisted record type.
///
/// Implementations map field names to typed struct fields explicitly, so the
/// set of assignable names is fixed at compile time.
pub trait Model: Default + Clone {
    /// Storage table name.
    fn table() -> &'static str;

    /// Ordered field names, `id` included.
    fn columns() -> &'static [&'static str];

    /// Reads one field; `None` for names outside `columns()`.
    fn get(&self, field: &str) -> Option<FieldValue>;

    /// Assigns one field.
    ///
    /// # Errors
    /// - `FieldError::UnknownField` for names outside `columns()`.
    /// - `FieldError::TypeMismatch` when `value` does not fit the field.
    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), FieldError>;

    /// Returns whether `field` is one of `columns()`.
    fn has_column(field: &str) -> bool {
        Self::columns().contains(&field)
    }

    /// Current identifier value, `Null` for transient records.
    fn id_value(&self) -> FieldValue {
        self.get(ID_FIELD).unwrap_or(FieldValue::Null)
    }
}

/// Set of field names a mutation may assign on model `M`.
///
/// Built once and validated against `M::columns()`, so a typo fails at
/// construction instead of silently never matching.
#[derive(Debug)]
pub struct FieldWhitelist<M: Model> {
    fields: Vec<&'static str>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for FieldWhitelist<M> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> FieldWhitelist<M> {
    /// Creates a whitelist from field names.
    ///
    /// Duplicates collapse to their first occurrence.
    ///
    /// # Errors
    /// - `FieldError::UnknownField` when a name is not a column of `M`.
    pub fn new<I, S>(names: I) -> Result<Self, FieldError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = Vec::new();
        for name in names {
            let field = resolve_column::<M>(name.as_ref())?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Ok(Self {
            fields,
            _model: PhantomData,
        })
    }

    /// Whitelist holding every column of `M`.
    pub fn all() -> Self {
        Self {
            fields: M::columns().to_vec(),
            _model: PhantomData,
        }
    }

    /// Adds `removed` and `removed_at` so soft deletes take effect.
    ///
    /// # Errors
    /// - `FieldError::UnknownField` when `M` has no soft-delete columns.
    pub fn with_soft_delete(mut self) -> Result<Self, FieldError> {
        for name in [REMOVED_FIELD, REMOVED_AT_FIELD] {
            let field = resolve_column::<M>(name)?;
            if !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
        Ok(self)
    }

    /// Whether both soft-delete fields are whitelisted.
    pub fn covers_soft_delete(&self) -> bool {
        self.contains(REMOVED_FIELD) && self.contains(REMOVED_AT_FIELD)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn resolve_column<M: Model>(name: &str) -> Result<&'static str, FieldError> {
    M::columns()
        .iter()
        .copied()
        .find(|column| *column == name)
        .ok_or_else(|| FieldError::UnknownField {
            table: M::table(),
            field: name.to_string(),
        })
}
