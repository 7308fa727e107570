//! Persistence session contract and SQLite unit-of-work.
//!
//! # Responsibility
//! - Define the single capability mutation helpers need from a session:
//!   registering a record for a future write.
//! - Provide a SQLite session that batches registered records and flushes
//!   them atomically on `commit()`.
//!
//! # Invariants
//! - Registration never touches the database; only `commit()` writes.
//! - Only records loaded through this session are written with `UPDATE`;
//!   every other record is a plain `INSERT`, so a duplicate key fails.
//! - Re-registering a record with the same `(table, id)` replaces the
//!   earlier snapshot, so the last registered state wins.
//! - A failed commit writes nothing and keeps pending records.

use crate::model::field::{Model, ID_FIELD};
use crate::model::value::FieldValue;
use crate::query::filter::FilterSpec;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{quote_ident, quote_ident_list};
use log::{debug, error, info};
use rusqlite::{params_from_iter, Connection};
use std::cell::RefCell;
use std::time::Instant;

/// Pending-write capability of a persistence session.
pub trait Session {
    /// Adds `record` to the set of records written on the next commit.
    fn register_for_save<M: Model>(&mut self, record: &M) -> RepoResult<()>;
}

/// Outcome of a successful `SqliteSession::commit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Row ids of inserted records, in registration order.
    pub inserted_ids: Vec<i64>,
    /// Number of loaded records updated in place.
    pub updated: usize,
}

impl CommitReport {
    pub fn total(&self) -> usize {
        self.inserted_ids.len() + self.updated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Insert,
    Update,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    kind: WriteKind,
    table: &'static str,
    id: FieldValue,
    columns: &'static [&'static str],
    values: Vec<FieldValue>,
}

impl PendingWrite {
    fn is_for(&self, table: &str, id: &FieldValue) -> bool {
        !self.id.is_null() && self.table == table && self.id == *id
    }
}

/// SQLite-backed unit-of-work over a migrated connection.
pub struct SqliteSession<'conn> {
    conn: &'conn mut Connection,
    pending: Vec<PendingWrite>,
    loaded: RefCell<Vec<(&'static str, FieldValue)>>,
}

impl<'conn> SqliteSession<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self {
            conn,
            pending: Vec::new(),
            loaded: RefCell::new(Vec::new()),
        }
    }

    /// Read access for finders.
    pub fn connection(&self) -> &Connection {
        self.conn
    }

    /// Number of records waiting for commit.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Records that `(table, id)` exists in storage.
    pub(crate) fn mark_loaded(&self, table: &'static str, id: &FieldValue) {
        if id.is_null() || self.is_loaded(table, id) {
            return;
        }
        self.loaded.borrow_mut().push((table, id.clone()));
    }

    fn is_loaded(&self, table: &str, id: &FieldValue) -> bool {
        self.loaded
            .borrow()
            .iter()
            .any(|(loaded_table, loaded_id)| *loaded_table == table && loaded_id == id)
    }

    /// Column values of the pending snapshot for `(table, id)`, when its
    /// column layout is `columns`.
    pub(crate) fn pending_values(
        &self,
        table: &str,
        columns: &[&str],
        id: &FieldValue,
    ) -> Option<&[FieldValue]> {
        self.pending
            .iter()
            .find(|write| write.is_for(table, id) && write.columns == columns)
            .map(|write| write.values.as_slice())
    }

    /// Writes every pending record in one transaction.
    ///
    /// Records loaded through this session are updated by `id`. All other
    /// records are inserted; those without id get a storage-assigned one.
    ///
    /// # Errors
    /// - `RepoError::InvalidIdentifier` for non-plain table/column names.
    /// - `RepoError::Db` for SQL failures, including duplicate keys on insert.
    /// - `RepoError::NotFound` when a loaded record no longer exists.
    ///
    /// On error the transaction is rolled back and pending records are kept.
    pub fn commit(&mut self) -> RepoResult<CommitReport> {
        let started_at = Instant::now();
        let mut report = CommitReport::default();

        let result = self.flush_pending(&mut report);

        match result {
            Ok(()) => {
                for write in std::mem::take(&mut self.pending) {
                    if write.kind == WriteKind::Insert && !write.id.is_null() {
                        self.mark_loaded(write.table, &write.id);
                    }
                }
                info!(
                    "event=session_commit module=repo status=ok inserted={} updated={} duration_ms={}",
                    report.inserted_ids.len(),
                    report.updated,
                    started_at.elapsed().as_millis()
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=session_commit module=repo status=error pending={} duration_ms={} error={}",
                    self.pending.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn flush_pending(&mut self, report: &mut CommitReport) -> RepoResult<()> {
        let tx = self.conn.transaction()?;
        for write in &self.pending {
            match write.kind {
                WriteKind::Insert => {
                    tx.execute(&insert_sql(write)?, params_from_iter(insert_values(write)))?;
                    report.inserted_ids.push(tx.last_insert_rowid());
                }
                WriteKind::Update => {
                    let changed =
                        tx.execute(&update_sql(write)?, params_from_iter(update_values(write)))?;
                    if changed == 0 {
                        return Err(RepoError::NotFound {
                            table: write.table,
                            filter: FilterSpec::by_id(write.id.clone()),
                        });
                    }
                    report.updated += 1;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Discards pending records and returns how many were dropped.
    pub fn rollback(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        info!("event=session_rollback module=repo status=ok dropped={dropped}");
        dropped
    }
}

impl Session for SqliteSession<'_> {
    fn register_for_save<M: Model>(&mut self, record: &M) -> RepoResult<()> {
        let columns = M::columns();
        let values = columns
            .iter()
            .map(|column| record.get(column).unwrap_or(FieldValue::Null))
            .collect();
        let table = M::table();
        let id = record.id_value();
        let existing = self
            .pending
            .iter()
            .position(|pending| pending.is_for(table, &id));
        let kind = match existing {
            Some(index) => self.pending[index].kind,
            None if self.is_loaded(table, &id) => WriteKind::Update,
            None => WriteKind::Insert,
        };
        let write = PendingWrite {
            kind,
            table,
            id,
            columns,
            values,
        };

        debug!(
            "event=session_register module=repo status=ok table={} has_id={} kind={:?} replaced={}",
            write.table,
            !write.id.is_null(),
            write.kind,
            existing.is_some()
        );

        match existing {
            Some(index) => self.pending[index] = write,
            None => self.pending.push(write),
        }
        Ok(())
    }
}

fn insert_columns(write: &PendingWrite) -> Vec<&'static str> {
    write
        .columns
        .iter()
        .copied()
        .filter(|column| *column != ID_FIELD || !write.id.is_null())
        .collect()
}

fn insert_values(write: &PendingWrite) -> Vec<rusqlite::types::Value> {
    write
        .columns
        .iter()
        .zip(&write.values)
        .filter(|(column, _)| **column != ID_FIELD || !write.id.is_null())
        .map(|(_, value)| value.to_sql_value())
        .collect()
}

fn update_values(write: &PendingWrite) -> Vec<rusqlite::types::Value> {
    let mut values: Vec<_> = write
        .columns
        .iter()
        .zip(&write.values)
        .filter(|(column, _)| **column != ID_FIELD)
        .map(|(_, value)| value.to_sql_value())
        .collect();
    values.push(write.id.to_sql_value());
    values
}

fn insert_sql(write: &PendingWrite) -> RepoResult<String> {
    let columns = insert_columns(write);
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_ident(write.table)?,
        quote_ident_list(&columns)?,
        placeholders(columns.len())
    ))
}

fn update_sql(write: &PendingWrite) -> RepoResult<String> {
    let assignments = write
        .columns
        .iter()
        .filter(|column| **column != ID_FIELD)
        .map(|column| quote_ident(column).map(|quoted| format!("{quoted} = ?")))
        .collect::<RepoResult<Vec<_>>>()?;

    // Id-only models: a no-op assignment keeps the changed-row check.
    let set_clause = if assignments.is_empty() {
        format!("{0} = {0}", quote_ident(ID_FIELD)?)
    } else {
        assignments.join(", ")
    };

    Ok(format!(
        "UPDATE {} SET {} WHERE {} = ?;",
        quote_ident(write.table)?,
        set_clause,
        quote_ident(ID_FIELD)?
    ))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
