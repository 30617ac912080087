//! Domain model for action trees and the activity journal.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the persisted JSON shapes next to their in-memory counterparts.
//!
//! # Invariants
//! - Every item is identified by a stable `ActionId`.
//! - Visibility is always one of two explicit states, never "unset".

pub mod action;
pub mod journal;
pub mod tree_key;
