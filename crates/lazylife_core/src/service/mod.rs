//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate tree transforms, persistence and journal writes into
//!   use-case level APIs.
//! - Keep UI layers decoupled from storage details.

pub mod action_session;
pub mod journal_service;
pub mod undo;
