//! Journal activity model.
//!
//! # Responsibility
//! - Define the activity entries written when items are completed or
//!   archived by the daily sweep.
//! - Define the natural key of one journal document.
//!
//! # Invariants
//! - One journal document exists per (user, local date, visibility).
//! - Entry ids equal the originating item id, so repeated appends of the
//!   same archived item collapse on read.

use crate::model::action::{is_public_flag, ActionId, Visibility};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category of the item that produced an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Action,
    Habit,
    Target,
}

/// Whether the entry records a completion or an explicit un-completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Completed,
    /// Never written here; un-completions retract the entry instead. Kept so
    /// stored documents carrying this status still deserialize.
    Uncompleted,
}

/// One immutable line of the activity journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalActivityEntry {
    pub id: ActionId,
    pub kind: ActivityKind,
    pub description: String,
    /// Unix epoch milliseconds of the recorded event.
    pub timestamp: i64,
    pub status: ActivityStatus,
    #[serde(rename = "isPublic", with = "is_public_flag", default)]
    pub visibility: Visibility,
    /// Ancestor breadcrumb (`"Parent / Child"`), absent for root items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Natural key of one journal document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JournalKey {
    pub user_id: String,
    pub date: NaiveDate,
    pub visibility: Visibility,
}

impl JournalKey {
    pub fn new(user_id: impl Into<String>, date: NaiveDate, visibility: Visibility) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            visibility,
        }
    }
}

/// Stored journal document: free text plus ordered activity entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalDocument {
    pub key: JournalKey,
    /// Free-text body edited by the journal UI. Preserved verbatim here.
    pub body: String,
    pub entries: Vec<JournalActivityEntry>,
}

impl JournalDocument {
    /// Creates an empty document for `key`.
    pub fn empty(key: JournalKey) -> Self {
        Self {
            key,
            body: String::new(),
            entries: Vec::new(),
        }
    }
}
