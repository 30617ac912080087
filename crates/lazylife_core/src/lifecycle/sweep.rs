//! Pure day-boundary sweep over an action forest.
//!
//! # Invariants
//! - An item is archived only when it was completed before the cutoff and
//!   none of its children survive the same pass.
//! - A parent never leaves in the same pass as a descendant that completed
//!   on a later local day. It stays behind as a ghost and goes on the next
//!   sweep, once that descendant is gone.
//! - A stale completed item that keeps a child stays in the tree unmodified
//!   ("ghosted") and is reported, never archived.
//! - Open items and items completed at or after the cutoff are untouched.
//! - Running the sweep again on its own output with the same cutoff archives
//!   nothing already archived.

use crate::clock::local_date;
use crate::model::action::{ActionId, Visibility};
use crate::model::journal::{ActivityKind, ActivityStatus, JournalActivityEntry};
use crate::tree::ActionTree;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::HashMap;

/// An item removed from the live tree by the sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedAction {
    pub id: ActionId,
    pub description: String,
    pub completed_at: i64,
    pub visibility: Visibility,
    /// Ancestor descriptions at archive time.
    pub breadcrumb: Option<String>,
}

impl ArchivedAction {
    /// Journal entry recording this archived completion.
    pub fn to_entry(&self, kind: ActivityKind) -> JournalActivityEntry {
        JournalActivityEntry {
            id: self.id,
            kind,
            description: self.description.clone(),
            timestamp: self.completed_at,
            status: ActivityStatus::Completed,
            visibility: self.visibility,
            details: self.breadcrumb.clone(),
        }
    }
}

/// Output of one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    pub tree: ActionTree,
    /// Archived items in post-order.
    pub archived: Vec<ArchivedAction>,
    /// Stale completed items kept back, in depth-first order.
    pub ghosted: Vec<ActionId>,
}

/// Splits stale completed subtrees off `tree`.
///
/// `start_of_today_ms` is the first instant of the user's local day in
/// `timezone`.
pub fn sweep(tree: &ActionTree, timezone: Tz, start_of_today_ms: i64) -> SweepOutcome {
    let mut archived = Vec::new();
    let mut ghosted = Vec::new();
    // Latest local completion day among cleared items, per cleared subtree.
    let mut cleared_day: HashMap<ActionId, NaiveDate> = HashMap::new();

    for id in tree.iter_depth_first().into_iter().rev() {
        let Some(item) = tree.get(id) else {
            continue;
        };
        let Some(completed_at) = item.completed_at else {
            continue;
        };
        if completed_at >= start_of_today_ms {
            continue;
        }

        let children = tree.children(id).unwrap_or(&[]);
        let all_children_cleared = children.iter().all(|child| cleared_day.contains_key(child));
        let own_day = local_date(timezone, completed_at);
        let latest_child_day = children
            .iter()
            .filter_map(|child| cleared_day.get(child).copied())
            .max();
        let outlived_by_child = latest_child_day.is_some_and(|day| day > own_day);

        if !all_children_cleared || outlived_by_child {
            ghosted.push(id);
            continue;
        }
        cleared_day.insert(id, latest_child_day.map_or(own_day, |day| day.max(own_day)));
        archived.push(ArchivedAction {
            id,
            description: item.description.clone(),
            completed_at,
            visibility: item.visibility,
            breadcrumb: tree.breadcrumb(id),
        });
    }

    // Post-order: every archived item is a leaf by the time it is removed.
    let mut next = tree.clone();
    for item in &archived {
        next.remove_leaf(item.id);
    }
    ghosted.reverse();

    SweepOutcome {
        tree: next,
        archived,
        ghosted,
    }
}

#[cfg(test)]
mod tests {
    use super::sweep;
    use crate::model::action::{ActionNode, Visibility};
    use crate::tree::ActionTree;
    use chrono_tz::UTC;
    use uuid::Uuid;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    const TODAY: i64 = 100 * DAY_MS;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn open_and_fresh_items_are_untouched() {
        let tree = ActionTree::from_forest(vec![
            ActionNode::new(id(1), "open"),
            ActionNode::new(id(2), "today").completed_at(TODAY + 10),
        ])
        .unwrap();

        let outcome = sweep(&tree, UTC, TODAY);
        assert!(outcome.archived.is_empty());
        assert!(outcome.ghosted.is_empty());
        assert_eq!(outcome.tree, tree);
    }

    #[test]
    fn completion_exactly_at_cutoff_is_kept() {
        let tree =
            ActionTree::from_forest(vec![ActionNode::new(id(1), "edge").completed_at(TODAY)])
                .unwrap();
        assert!(sweep(&tree, UTC, TODAY).archived.is_empty());
    }

    #[test]
    fn archived_entry_carries_breadcrumb_and_visibility() {
        let tree = ActionTree::from_forest(vec![ActionNode::new(id(1), "Garden")
            .with_children(vec![ActionNode::new(id(2), "Weed")
                .completed_at(TODAY - DAY_MS)
                .with_visibility(Visibility::Private)])])
        .unwrap();

        let outcome = sweep(&tree, UTC, TODAY);
        assert_eq!(outcome.archived.len(), 1);
        let item = &outcome.archived[0];
        assert_eq!(item.breadcrumb.as_deref(), Some("Garden"));
        assert_eq!(item.visibility, Visibility::Private);
        assert_eq!(outcome.tree.children(id(1)).unwrap(), &[] as &[Uuid]);
    }

    #[test]
    fn completed_subtree_from_one_day_leaves_together() {
        let tree = ActionTree::from_forest(vec![ActionNode::new(id(1), "Trip")
            .completed_at(TODAY - DAY_MS + 50)
            .with_children(vec![
                ActionNode::new(id(2), "Tickets").completed_at(TODAY - DAY_MS + 10),
                ActionNode::new(id(3), "Hotel").completed_at(TODAY - DAY_MS + 20),
            ])])
        .unwrap();

        let outcome = sweep(&tree, UTC, TODAY);
        let ids: Vec<Uuid> = outcome.archived.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![id(3), id(2), id(1)]);
        assert!(outcome.tree.is_empty());
    }

    #[test]
    fn stale_parent_with_open_child_is_ghosted() {
        let tree = ActionTree::from_forest(vec![ActionNode::new(id(1), "Parent")
            .completed_at(TODAY - 2 * DAY_MS)
            .with_children(vec![ActionNode::new(id(2), "Still open")])])
        .unwrap();

        let outcome = sweep(&tree, UTC, TODAY);
        assert!(outcome.archived.is_empty());
        assert_eq!(outcome.ghosted, vec![id(1)]);
        assert_eq!(outcome.tree, tree);
    }

    #[test]
    fn second_sweep_with_same_cutoff_is_idempotent() {
        let tree = ActionTree::from_forest(vec![
            ActionNode::new(id(1), "old").completed_at(TODAY - 3 * DAY_MS),
            ActionNode::new(id(2), "keep"),
        ])
        .unwrap();

        let first = sweep(&tree, UTC, TODAY);
        assert_eq!(first.archived.len(), 1);
        let second = sweep(&first.tree, UTC, TODAY);
        assert!(second.archived.is_empty());
        assert_eq!(second.tree, first.tree);
    }
}
