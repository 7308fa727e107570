//! Record model contracts shared by mutation helpers and storage.
//!
//! # Responsibility
//! - Define the field accessor surface (`Model`) and value type (`FieldValue`).
//! - Ship one concrete soft-deletable model (`Contact`).
//!
//! # Invariants
//! - Every model is addressed by an `id` field.
//! - Deletion is represented by `removed`/`removed_at`, not hard delete.

pub mod contact;
pub mod field;
pub mod value;
