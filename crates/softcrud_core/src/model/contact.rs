//! Contact sample model.
//!
//! # Responsibility
//! - Provide a concrete soft-deletable record bound to the `contacts` table.
//! - Map field names to typed struct fields for generic mutation helpers.
//!
//! # Invariants
//! - `id` is `None` until storage assigns one.
//! - `removed_at` is set whenever `removed` was set through soft delete.

use crate::model::field::{FieldError, Model};
use crate::model::value::FieldValue;
use serde::{Deserialize, Serialize};

const CONTACT_COLUMNS: &[&str] = &["id", "name", "email", "phone", "removed", "removed_at"];

/// Address-book entry persisted in `contacts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Row id, assigned by SQLite on first insert.
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Soft delete tombstone.
    pub removed: bool,
    /// UTC epoch milliseconds of the soft delete.
    pub removed_at: Option<i64>,
}

impl Contact {
    /// Returns whether this contact should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.removed
    }
}

impl Model for Contact {
    fn table() -> &'static str {
        "contacts"
    }

    fn columns() -> &'static [&'static str] {
        CONTACT_COLUMNS
    }

    fn get(&self, field: &str) -> Option<FieldValue> {
        let value: FieldValue = match field {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "email" => self.email.clone().into(),
            "phone" => self.phone.clone().into(),
            "removed" => self.removed.into(),
            "removed_at" => self.removed_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), FieldError> {
        match field {
            "id" => self.id = optional_integer(field, value)?,
            "name" => {
                self.name = match value {
                    FieldValue::Text(text) => text,
                    other => return Err(FieldError::mismatch(field, "text", &other)),
                }
            }
            "email" => self.email = optional_text(field, value)?,
            "phone" => self.phone = optional_text(field, value)?,
            "removed" => {
                self.removed = value
                    .as_bool()
                    .ok_or_else(|| FieldError::mismatch(field, "bool", &value))?
            }
            "removed_at" => self.removed_at = optional_integer(field, value)?,
            _ => {
                return Err(FieldError::UnknownField {
                    table: Self::table(),
                    field: field.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn optional_text(field: &str, value: FieldValue) -> Result<Option<String>, FieldError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Text(text) => Ok(Some(text)),
        other => Err(FieldError::mismatch(field, "text or null", &other)),
    }
}

fn optional_integer(field: &str, value: FieldValue) -> Result<Option<i64>, FieldError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Integer(number) => Ok(Some(number)),
        other => Err(FieldError::mismatch(field, "integer or null", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::Contact;
    use crate::model::field::{FieldError, Model};
    use crate::model::value::FieldValue;

    #[test]
    fn set_then_get_each_column() {
        let mut contact = Contact::default();
        contact.set("id", FieldValue::Integer(7)).unwrap();
        contact.set("name", "ada".into()).unwrap();
        contact.set("email", "ada@example.com".into()).unwrap();
        contact.set("removed", FieldValue::Integer(1)).unwrap();
        contact.set("removed_at", FieldValue::Integer(1_700_000_000_000)).unwrap();

        assert_eq!(contact.get("id"), Some(FieldValue::Integer(7)));
        assert_eq!(contact.get("name"), Some("ada".into()));
        assert_eq!(contact.get("phone"), Some(FieldValue::Null));
        assert_eq!(contact.get("removed"), Some(FieldValue::Bool(true)));
        assert!(!contact.is_active());
        assert_eq!(contact.get("nickname"), None);
    }

    #[test]
    fn rejected_value_leaves_field_untouched() {
        let mut contact = Contact {
            name: "ada".to_string(),
            ..Contact::default()
        };
        let err = contact.set("name", FieldValue::Integer(3)).unwrap_err();
        assert!(matches!(err, FieldError::TypeMismatch { .. }));
        assert_eq!(contact.name, "ada");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = Contact::default()
            .set("nickname", "x".into())
            .unwrap_err();
        assert_eq!(
            err,
            FieldError::UnknownField {
                table: "contacts",
                field: "nickname".to_string(),
            }
        );
    }
}
