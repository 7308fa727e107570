//! Persistence collaborators behind the mutation helpers.
//!
//! # Responsibility
//! - Define the `Session` and `RecordFinder` seams mutation helpers depend on.
//! - Provide SQLite implementations of both.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `MultipleMatches`)
//!   next to untouched DB transport errors.
//! - SQL is built from validated identifiers and bound values only.

pub mod error;
pub mod finder;
pub mod session;
mod sql;
