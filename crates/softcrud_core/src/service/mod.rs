//! Use-case services on top of repository collaborators.
//!
//! # Responsibility
//! - Turn filter specs and payloads into located, mutated, registered records.
//! - Keep storage details behind the `Session`/`RecordFinder` seams.

pub mod mutation_service;
