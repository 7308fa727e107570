//! CLI probe for `softcrud_core`.
//!
//! # Responsibility
//! - Verify core crate wiring without an embedding application.
//! - Run one create -> update -> soft delete lifecycle against a database.
//!
//! Configuration comes from the environment: `SOFTCRUD_DB` (database path,
//! in-memory when unset) plus the logging variables read by
//! `LoggingConfig::from_env`.

use softcrud_core::db::{open_db, open_db_in_memory};
use softcrud_core::logging::LoggingConfig;
use softcrud_core::{
    core_version, Contact, FieldWhitelist, Payload, RecordMutator, RepoResult, SqlFinder,
    SqliteSession,
};
use std::error::Error;
use std::process::ExitCode;

const DB_PATH_ENV: &str = "SOFTCRUD_DB";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("softcrud error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Some(config) = LoggingConfig::from_env()? {
        config.init()?;
    }
    println!("softcrud_core version={}", core_version());

    let mut conn = match std::env::var(DB_PATH_ENV) {
        Ok(path) => open_db(path)?,
        Err(_) => open_db_in_memory()?,
    };

    let contact = demo_lifecycle(SqliteSession::new(&mut conn))?;
    println!("{}", serde_json::to_string_pretty(&contact)?);
    Ok(())
}

fn demo_lifecycle(session: SqliteSession<'_>) -> RepoResult<Contact> {
    let finder = SqlFinder::new();
    let fields = FieldWhitelist::<Contact>::new(["name", "email", "phone"])?.with_soft_delete()?;
    let mut mutator = RecordMutator::new(session);

    mutator.create(
        &fields,
        &Payload::new()
            .with("name", "Ada Lovelace")
            .with("email", "ada@example.com"),
    )?;
    let report = mutator.session_mut().commit()?;
    log::info!(
        "event=cli_demo module=cli status=created inserted={}",
        report.inserted_ids.len()
    );
    let Some(id) = report.inserted_ids.first().copied() else {
        return Ok(Contact::default());
    };

    mutator.update_by_id(&finder, &fields, id, &Payload::new().with("phone", "555-0100"))?;
    mutator.session_mut().commit()?;

    let removed = mutator.delete_by_id(&finder, &fields, id, None)?;
    mutator.session_mut().commit()?;
    Ok(removed)
}
