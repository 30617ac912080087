//! Persistence ports and their SQLite adapters.
//!
//! # Responsibility
//! - Define the whole-document tree store and the journal store contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`InvalidData`) in addition to
//!   DB transport errors.

pub mod action_repo;
pub mod journal_repo;
