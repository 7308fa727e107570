//! Mutation inputs: filter specifications and update payloads.
//!
//! # Responsibility
//! - Describe *which* record to touch (`FilterSpec`) and *what* to set
//!   (`Payload`) independently of any storage backend.
//!
//! # Invariants
//! - Both types are plain data; interpretation belongs to finders and
//!   mutation helpers.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod filter;
pub mod payload;

/// Error for JSON filter/payload input.
#[derive(Debug)]
pub enum ParseError {
    Json(serde_json::Error),
    Shape(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid json: {err}"),
            Self::Shape(message) => write!(f, "invalid filter spec: {message}"),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Shape(_) => None,
        }
    }
}
