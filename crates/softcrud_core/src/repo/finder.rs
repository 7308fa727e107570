//! Record lookup contract and SQLite filter compiler.
//!
//! # Responsibility
//! - Define how mutation helpers locate zero-or-one record from a filter spec.
//! - Compile filter specs into parameterized SQLite `WHERE` clauses.
//!
//! # Invariants
//! - All entries, and all clauses inside an entry, are AND-ed.
//! - Filter values are always bound, never spliced into SQL text.
//! - More than one match is reported, never silently truncated.
//! - Filters match committed rows. A located row that has a pending snapshot
//!   in the session is returned as that snapshot.

use crate::model::field::{FieldError, Model};
use crate::model::value::FieldValue;
use crate::query::filter::{FilterClause, FilterOp, FilterSpec};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::session::SqliteSession;
use crate::repo::sql::{quote_ident, quote_ident_list};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};

/// Locates at most one record of `M` for a filter spec.
///
/// Filter composition and operator meaning are defined by the implementation.
pub trait RecordFinder<S: ?Sized> {
    /// Returns the single matching record, or `None` when nothing matches.
    fn find<M: Model>(&self, session: &S, filter: &FilterSpec) -> RepoResult<Option<M>>;
}

/// Finder over a `SqliteSession` connection that sees the session's own
/// pending writes for the rows it locates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlFinder;

impl SqlFinder {
    pub fn new() -> Self {
        Self
    }
}

impl<'conn> RecordFinder<SqliteSession<'conn>> for SqlFinder {
    fn find<M: Model>(
        &self,
        session: &SqliteSession<'conn>,
        filter: &FilterSpec,
    ) -> RepoResult<Option<M>> {
        let (where_sql, bind_values) = compile_filter::<M>(filter)?;
        let sql = format!(
            "SELECT {} FROM {}{} LIMIT 2;",
            quote_ident_list(M::columns())?,
            quote_ident(M::table())?,
            where_sql
        );

        let mut stmt = session.connection().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;

        let Some(first) = rows.next()? else {
            debug!(
                "event=record_find module=repo status=ok table={} clauses={} found=false",
                M::table(),
                filter.clauses().count()
            );
            return Ok(None);
        };
        let mut record = parse_model_row::<M>(first)?;

        if rows.next()?.is_some() {
            return Err(RepoError::MultipleMatches {
                table: M::table(),
                filter: filter.clone(),
            });
        }

        let id = record.id_value();
        session.mark_loaded(M::table(), &id);
        let pending = session.pending_values(M::table(), M::columns(), &id);
        let overlaid = pending.is_some();
        if let Some(values) = pending {
            record = record_from_values::<M>(values.iter().cloned())?;
        }

        debug!(
            "event=record_find module=repo status=ok table={} clauses={} found=true overlaid={}",
            M::table(),
            filter.clauses().count(),
            overlaid
        );
        Ok(Some(record))
    }
}

/// Compiles `filter` into ` WHERE ...` (or an empty string) plus bind values.
pub(crate) fn compile_filter<M: Model>(filter: &FilterSpec) -> RepoResult<(String, Vec<Value>)> {
    let mut conditions = Vec::new();
    let mut bind_values = Vec::new();

    for clause in filter.clauses() {
        if !M::has_column(&clause.field) {
            return Err(FieldError::UnknownField {
                table: M::table(),
                field: clause.field.clone(),
            }
            .into());
        }
        conditions.push(compile_clause(clause, &mut bind_values)?);
    }

    if conditions.is_empty() {
        return Ok((String::new(), bind_values));
    }
    Ok((format!(" WHERE {}", conditions.join(" AND ")), bind_values))
}

fn compile_clause(clause: &FilterClause, bind_values: &mut Vec<Value>) -> RepoResult<String> {
    let column = quote_ident(&clause.field)?;
    let value = &clause.value;

    let condition = match clause.op {
        FilterOp::Eq => {
            bind_values.push(value.to_sql_value());
            format!("{column} IS ?")
        }
        FilterOp::Ne => {
            bind_values.push(value.to_sql_value());
            format!("{column} IS NOT ?")
        }
        FilterOp::Gt => ordered_comparison(clause, &column, ">", bind_values)?,
        FilterOp::Gte => ordered_comparison(clause, &column, ">=", bind_values)?,
        FilterOp::Lt => ordered_comparison(clause, &column, "<", bind_values)?,
        FilterOp::Lte => ordered_comparison(clause, &column, "<=", bind_values)?,
        FilterOp::Like => {
            if value.as_str().is_none() {
                return Err(invalid_operand(clause, "text"));
            }
            bind_values.push(value.to_sql_value());
            format!("{column} LIKE ?")
        }
        FilterOp::IsNull => match value {
            FieldValue::Bool(true) => format!("{column} IS NULL"),
            FieldValue::Bool(false) => format!("{column} IS NOT NULL"),
            _ => return Err(invalid_operand(clause, "bool")),
        },
    };

    Ok(condition)
}

fn ordered_comparison(
    clause: &FilterClause,
    column: &str,
    symbol: &str,
    bind_values: &mut Vec<Value>,
) -> RepoResult<String> {
    if !matches!(
        clause.value,
        FieldValue::Integer(_) | FieldValue::Real(_) | FieldValue::Text(_)
    ) {
        return Err(invalid_operand(clause, "integer, real or text"));
    }
    bind_values.push(clause.value.to_sql_value());
    Ok(format!("{column} {symbol} ?"))
}

fn invalid_operand(clause: &FilterClause, expected: &str) -> RepoError {
    RepoError::InvalidFilter(format!(
        "`{}` on `{}` expects {expected}, got {}",
        clause.op.as_str(),
        clause.field,
        clause.value.type_name()
    ))
}

fn parse_model_row<M: Model>(row: &Row<'_>) -> RepoResult<M> {
    let values = (0..M::columns().len())
        .map(|index| row.get::<_, Value>(index).map(FieldValue::from))
        .collect::<Result<Vec<_>, _>>()?;
    record_from_values::<M>(values)
        .map_err(|err| RepoError::InvalidData(format!("{}: {err}", M::table())))
}

fn record_from_values<M: Model>(
    values: impl IntoIterator<Item = FieldValue>,
) -> Result<M, FieldError> {
    let mut record = M::default();
    for (column, value) in M::columns().iter().zip(values) {
        record.set(column, value)?;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::compile_filter;
    use crate::model::contact::Contact;
    use crate::query::filter::{FilterEntry, FilterOp, FilterSpec};
    use crate::repo::error::RepoError;
    use rusqlite::types::Value;

    #[test]
    fn empty_spec_has_no_where_clause() {
        let (sql, binds) = compile_filter::<Contact>(&FilterSpec::new()).unwrap();
        assert!(sql.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn entries_and_clauses_are_and_joined_in_order() {
        let spec = FilterSpec::by_id(7_i64).entry(
            FilterEntry::new()
                .with("removed", FilterOp::Eq, false)
                .with("email", FilterOp::IsNull, true),
        );
        let (sql, binds) = compile_filter::<Contact>(&spec).unwrap();
        assert_eq!(
            sql,
            " WHERE \"id\" IS ? AND \"removed\" IS ? AND \"email\" IS NULL"
        );
        assert_eq!(binds, vec![Value::Integer(7), Value::Integer(0)]);
    }

    #[test]
    fn unknown_column_and_bad_operands_are_rejected() {
        let unknown = compile_filter::<Contact>(&FilterSpec::eq("nickname", "x")).unwrap_err();
        assert!(matches!(unknown, RepoError::Field(_)));

        let like_int =
            FilterSpec::new().entry(FilterEntry::new().with("name", FilterOp::Like, 3_i64));
        assert!(matches!(
            compile_filter::<Contact>(&like_int).unwrap_err(),
            RepoError::InvalidFilter(_)
        ));

        let gt_null = FilterSpec::new().entry(FilterEntry::new().with(
            "removed_at",
            FilterOp::Gt,
            None::<i64>,
        ));
        assert!(matches!(
            compile_filter::<Contact>(&gt_null).unwrap_err(),
            RepoError::InvalidFilter(_)
        ));
    }
}
