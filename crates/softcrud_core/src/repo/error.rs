//! Repository error type shared by mutation helpers and their collaborators.

use crate::db::DbError;
use crate::model::field::FieldError;
use crate::query::filter::FilterSpec;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for record location, mutation and persistence.
#[derive(Debug)]
pub enum RepoError {
    /// The filter spec resolved to no record.
    NotFound {
        table: &'static str,
        filter: FilterSpec,
    },
    /// The filter spec resolved to more than one record.
    MultipleMatches {
        table: &'static str,
        filter: FilterSpec,
    },
    Field(FieldError),
    /// Filter clause cannot be compiled for this model.
    InvalidFilter(String),
    /// Table or column name is not a plain SQL identifier.
    InvalidIdentifier(String),
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { table, filter } => {
                write!(f, "no `{table}` record matches filter {filter}")
            }
            Self::MultipleMatches { table, filter } => {
                write!(f, "more than one `{table}` record matches filter {filter}")
            }
            Self::Field(err) => write!(f, "{err}"),
            Self::InvalidFilter(message) => write!(f, "invalid filter: {message}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid sql identifier `{name}`"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FieldError> for RepoError {
    fn from(value: FieldError) -> Self {
        Self::Field(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
