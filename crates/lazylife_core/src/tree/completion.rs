//! Completion recalculation.
//!
//! # Invariants
//! - Recalculation only un-marks; it never completes an open item.
//! - An item stays completed only if its whole subtree is completed.

use super::{ActionTree, Reshaped};
use crate::model::action::{ActionId, Visibility};
use std::collections::HashMap;

/// An item un-marked by recalculation, with what is needed to retract its
/// journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UncompletedAction {
    pub id: ActionId,
    pub old_completed_at: i64,
    pub visibility: Visibility,
}

impl ActionTree {
    /// Un-marks every completed item that has an open descendant.
    pub fn recalculate_completion(&self) -> Reshaped {
        let mut next = self.clone();
        let uncompleted = next.recalculate_in_place();
        Reshaped {
            tree: next,
            uncompleted,
            visibility_changes: Vec::new(),
        }
    }

    pub(super) fn recalculate_in_place(&mut self) -> Vec<UncompletedAction> {
        let order = self.preorder(&self.roots);
        let mut subtree_done: HashMap<ActionId, bool> = HashMap::with_capacity(order.len());
        let mut uncompleted = Vec::new();

        for id in order.into_iter().rev() {
            let Some(slot) = self.slots.get_mut(&id) else {
                continue;
            };
            let children_done = slot
                .children
                .iter()
                .all(|child| subtree_done.get(child).copied().unwrap_or(true));
            if !children_done {
                if let Some(old_completed_at) = slot.item.completed_at.take() {
                    uncompleted.push(UncompletedAction {
                        id,
                        old_completed_at,
                        visibility: slot.item.visibility,
                    });
                }
            }
            subtree_done.insert(id, children_done && slot.item.is_completed());
        }
        uncompleted
    }
}
