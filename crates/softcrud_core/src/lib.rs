//! Generic record mutation helpers over a persistence session.
//!
//! Create records from whitelisted payloads, update one record located by id
//! or by a filter spec, and soft delete by stamping `removed`/`removed_at`.
//! A SQLite session and finder are bundled as the default collaborators.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::contact::Contact;
pub use model::field::{
    FieldError, FieldWhitelist, Model, ID_FIELD, REMOVED_AT_FIELD, REMOVED_FIELD,
};
pub use model::value::FieldValue;
pub use query::filter::{FilterClause, FilterEntry, FilterOp, FilterSpec};
pub use query::payload::Payload;
pub use query::ParseError;
pub use repo::error::{RepoError, RepoResult};
pub use repo::finder::{RecordFinder, SqlFinder};
pub use repo::session::{CommitReport, Session, SqliteSession};
pub use service::mutation_service::{
    apply_payload, now_epoch_ms, soft_delete_payload, RecordMutator,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
