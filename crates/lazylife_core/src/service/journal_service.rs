//! Journal use-case service and grouping helpers.
//!
//! # Responsibility
//! - Append, retract and move activity entries with read-merge-upsert
//!   cycles over a `JournalStore`.
//! - Group archived items into per-document batches.
//!
//! # Invariants
//! - Reads collapse entries sharing an id, keeping the most recent write in
//!   the position of the first occurrence. At-least-once appends therefore
//!   never show an item twice.
//! - Retracting an id that is not present writes nothing.

use crate::clock::local_date;
use crate::lifecycle::ArchivedAction;
use crate::model::action::{ActionId, Visibility};
use crate::model::journal::{
    ActivityKind, ActivityStatus, JournalActivityEntry, JournalDocument, JournalKey,
};
use crate::repo::action_repo::RepoResult;
use crate::repo::journal_repo::JournalStore;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashMap};

/// Archive batches keyed by (local completion date, visibility).
pub type ArchiveGroups = BTreeMap<(NaiveDate, Visibility), Vec<JournalActivityEntry>>;

/// Journal service facade.
pub struct JournalService<J: JournalStore> {
    store: J,
}

impl<J: JournalStore> JournalService<J> {
    pub fn new(store: J) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &J {
        &self.store
    }

    /// Loads the document for `key` with duplicate entries collapsed.
    /// Missing documents read as empty.
    pub fn document(&self, key: &JournalKey) -> RepoResult<JournalDocument> {
        let mut document = self
            .store
            .load_document(key)?
            .unwrap_or_else(|| JournalDocument::empty(key.clone()));
        document.entries = dedupe_entries(document.entries);
        Ok(document)
    }

    /// Appends `entries` to the document for `key`. Returns the number of
    /// entries stored afterwards.
    pub fn append(
        &self,
        key: &JournalKey,
        entries: Vec<JournalActivityEntry>,
    ) -> RepoResult<usize> {
        let mut document = self.document(key)?;
        document.entries.extend(entries);
        document.entries = dedupe_entries(document.entries);
        self.store.upsert_document(&document)?;
        Ok(document.entries.len())
    }

    /// Removes entries with any of `ids` from the document for `key`.
    /// Returns how many were removed.
    pub fn retract(&self, key: &JournalKey, ids: &[ActionId]) -> RepoResult<usize> {
        let Some(mut document) = self.store.load_document(key)? else {
            return Ok(0);
        };
        let before = document.entries.len();
        document.entries.retain(|entry| !ids.contains(&entry.id));
        let removed = before - document.entries.len();
        if removed > 0 {
            document.entries = dedupe_entries(document.entries);
            self.store.upsert_document(&document)?;
        }
        Ok(removed)
    }

    /// Moves the entry `id` from the document at `from` to the one at `to`,
    /// updating its visibility. Returns `false` when `from` has no such entry.
    pub fn relocate(&self, from: &JournalKey, to: &JournalKey, id: ActionId) -> RepoResult<bool> {
        let source = self.document(from)?;
        let Some(mut entry) = source.entries.iter().rev().find(|entry| entry.id == id).cloned()
        else {
            return Ok(false);
        };
        self.retract(from, &[id])?;
        entry.visibility = to.visibility;
        self.append(to, vec![entry])?;
        Ok(true)
    }
}

/// Collapses entries sharing an id: the last one wins, placed where the
/// first one was.
pub fn dedupe_entries(entries: Vec<JournalActivityEntry>) -> Vec<JournalActivityEntry> {
    let mut slot_by_id: HashMap<ActionId, usize> = HashMap::with_capacity(entries.len());
    let mut unique: Vec<JournalActivityEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match slot_by_id.get(&entry.id) {
            Some(&index) => unique[index] = entry,
            None => {
                slot_by_id.insert(entry.id, unique.len());
                unique.push(entry);
            }
        }
    }
    unique
}

/// Groups archived items by local completion date and visibility.
pub fn group_archived(archived: &[ArchivedAction], kind: ActivityKind, tz: Tz) -> ArchiveGroups {
    let mut groups = ArchiveGroups::new();
    for item in archived {
        groups
            .entry((local_date(tz, item.completed_at), item.visibility))
            .or_default()
            .push(item.to_entry(kind));
    }
    groups
}

/// Entry recorded when an item is completed interactively.
pub fn completion_entry(
    id: ActionId,
    kind: ActivityKind,
    description: &str,
    completed_at: i64,
    visibility: Visibility,
    details: Option<String>,
) -> JournalActivityEntry {
    JournalActivityEntry {
        id,
        kind,
        description: description.to_string(),
        timestamp: completed_at,
        status: ActivityStatus::Completed,
        visibility,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::{completion_entry, dedupe_entries, group_archived};
    use crate::lifecycle::ArchivedAction;
    use crate::model::action::Visibility;
    use crate::model::journal::ActivityKind;
    use chrono::NaiveDate;
    use uuid::Uuid;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn archived(n: u128, completed_at: i64, visibility: Visibility) -> ArchivedAction {
        ArchivedAction {
            id: Uuid::from_u128(n),
            description: format!("item {n}"),
            completed_at,
            visibility,
            breadcrumb: None,
        }
    }

    #[test]
    fn dedupe_keeps_last_write_in_first_position() {
        let entry = |n: u128, at: i64| {
            completion_entry(
                Uuid::from_u128(n),
                ActivityKind::Action,
                "item",
                at,
                Visibility::Public,
                None,
            )
        };
        let a = entry(1, 1);
        let b = entry(2, 2);
        let a_again = completion_entry(
            Uuid::from_u128(1),
            ActivityKind::Action,
            "item",
            3,
            Visibility::Public,
            Some("Parent".to_string()),
        );

        let unique = dedupe_entries(vec![a, b, a_again.clone()]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0], a_again);
        assert_eq!(unique[1].id, Uuid::from_u128(2));
    }

    #[test]
    fn group_archived_splits_by_date_and_visibility() {
        let tz = chrono_tz::UTC;
        let groups = group_archived(
            &[
                archived(1, 0, Visibility::Public),
                archived(2, 10, Visibility::Private),
                archived(3, DAY_MS + 5, Visibility::Public),
                archived(4, 20, Visibility::Public),
            ],
            ActivityKind::Target,
            tz,
        );

        let day0 = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let day1 = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[&(day0, Visibility::Public)].len(), 2);
        assert_eq!(groups[&(day0, Visibility::Private)].len(), 1);
        assert_eq!(groups[&(day1, Visibility::Public)][0].id, Uuid::from_u128(3));
        assert!(groups
            .values()
            .flatten()
            .all(|entry| entry.kind == ActivityKind::Target));
    }
}
