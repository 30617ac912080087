//! Structural and semantic transforms over `ActionTree`.
//!
//! # Invariants
//! - Every transform borrows the input tree and returns a new one.
//! - An unknown target id yields `TreeError::NodeNotFound`; the caller's
//!   tree is untouched.
//! - Transforms that can give a completed item a new open descendant
//!   (`add`, `add_after`, `indent`, `outdent`, `restore`) finish with a
//!   completion recalculation and report what it un-marked.
//! - Transforms that move an item below a private parent make the moved
//!   subtree private and report the visibility changes.

use super::{ActionTree, Slot, TreeError, TreeResult, UncompletedAction};
use crate::model::action::{ActionId, ActionItem, ActionNode, DeletedNodeContext, Visibility};
use uuid::Uuid;

/// Result of an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inserted {
    pub tree: ActionTree,
    pub id: ActionId,
    pub uncompleted: Vec<UncompletedAction>,
}

/// Result of a transform that may cascade completion or privacy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reshaped {
    pub tree: ActionTree,
    pub uncompleted: Vec<UncompletedAction>,
    pub visibility_changes: Vec<VisibilityChange>,
}

/// Result of a deletion, carrying the undo snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub tree: ActionTree,
    pub context: DeletedNodeContext,
}

/// Visibility and completion of one item at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeState {
    pub visibility: Visibility,
    pub completed_at: Option<i64>,
}

/// One item whose visibility was changed by a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityChange {
    pub id: ActionId,
    pub from: Visibility,
    pub to: Visibility,
    pub completed_at: Option<i64>,
}

/// Result of `toggle_privacy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacyChange {
    pub tree: ActionTree,
    pub before: NodeState,
    pub after: NodeState,
    /// Every item whose visibility flipped, the target included.
    pub changes: Vec<VisibilityChange>,
}

impl ActionTree {
    /// Appends a new item as the last child of `parent` (or last root).
    ///
    /// The item is private whenever the parent is private.
    pub fn add(
        &self,
        description: &str,
        parent: Option<ActionId>,
        visibility: Visibility,
    ) -> TreeResult<Inserted> {
        self.add_with_id(Uuid::new_v4(), description, parent, visibility)
    }

    /// Same as `add` with a caller-provided id.
    pub fn add_with_id(
        &self,
        id: ActionId,
        description: &str,
        parent: Option<ActionId>,
        visibility: Visibility,
    ) -> TreeResult<Inserted> {
        let visibility = self.effective_visibility(parent, visibility)?;
        let index = self.siblings(parent).len();
        self.insert_leaf(id, description, parent, index, visibility)
    }

    /// Inserts a new item directly after `after` in the same sibling list.
    pub fn add_after(
        &self,
        after: ActionId,
        description: &str,
        visibility: Visibility,
    ) -> TreeResult<Inserted> {
        self.add_after_with_id(Uuid::new_v4(), after, description, visibility)
    }

    /// Same as `add_after` with a caller-provided id.
    pub fn add_after_with_id(
        &self,
        id: ActionId,
        after: ActionId,
        description: &str,
        visibility: Visibility,
    ) -> TreeResult<Inserted> {
        let (parent, index) = self
            .position(after)
            .ok_or(TreeError::NodeNotFound(after))?;
        let visibility = self.effective_visibility(parent, visibility)?;
        self.insert_leaf(id, description, parent, index + 1, visibility)
    }

    /// Flips completion of `id`.
    ///
    /// # Errors
    /// - `IncompleteDescendants` when completing an item whose subtree still
    ///   has open items. Un-completing is always allowed.
    pub fn toggle(&self, id: ActionId, now_ms: i64) -> TreeResult<ActionTree> {
        let item = self.get(id).ok_or(TreeError::NodeNotFound(id))?;
        let completing = !item.is_completed();
        if completing && self.has_open_descendant(id) {
            return Err(TreeError::IncompleteDescendants(id));
        }

        let mut next = self.clone();
        if let Some(slot) = next.slots.get_mut(&id) {
            slot.item.completed_at = completing.then_some(now_ms);
        }
        Ok(next)
    }

    /// Renames `id`.
    pub fn update_text(&self, id: ActionId, text: &str) -> TreeResult<ActionTree> {
        if !self.contains(id) {
            return Err(TreeError::NodeNotFound(id));
        }
        let description = normalize_description(text)?;
        let mut next = self.clone();
        if let Some(slot) = next.slots.get_mut(&id) {
            slot.item.description = description;
        }
        Ok(next)
    }

    /// Swaps `id` with its previous sibling. Unchanged when already first.
    pub fn move_up(&self, id: ActionId) -> TreeResult<ActionTree> {
        let (parent, index) = self.position(id).ok_or(TreeError::NodeNotFound(id))?;
        let mut next = self.clone();
        if index > 0 {
            if let Some(siblings) = next.siblings_mut(parent) {
                siblings.swap(index - 1, index);
            }
        }
        Ok(next)
    }

    /// Swaps `id` with its next sibling. Unchanged when already last.
    pub fn move_down(&self, id: ActionId) -> TreeResult<ActionTree> {
        let (parent, index) = self.position(id).ok_or(TreeError::NodeNotFound(id))?;
        let mut next = self.clone();
        if let Some(siblings) = next.siblings_mut(parent) {
            if index + 1 < siblings.len() {
                siblings.swap(index, index + 1);
            }
        }
        Ok(next)
    }

    /// Makes `id` the last child of its preceding sibling. Unchanged when
    /// `id` is the first sibling.
    pub fn indent(&self, id: ActionId) -> TreeResult<Reshaped> {
        let (parent, index) = self.position(id).ok_or(TreeError::NodeNotFound(id))?;
        if index == 0 {
            return Ok(Reshaped::unchanged(self.clone()));
        }
        let new_parent = self.siblings(parent)[index - 1];

        let mut next = self.clone();
        next.detach(id);
        let end = next.siblings(Some(new_parent)).len();
        next.attach(id, Some(new_parent), end);
        Ok(next.settle(id))
    }

    /// Moves `id` out of its parent to sit right after that parent.
    /// Unchanged when `id` is already a root item.
    pub fn outdent(&self, id: ActionId) -> TreeResult<Reshaped> {
        let parent = match self.slots.get(&id) {
            None => return Err(TreeError::NodeNotFound(id)),
            Some(slot) => match slot.parent {
                None => return Ok(Reshaped::unchanged(self.clone())),
                Some(parent) => parent,
            },
        };
        let (grandparent, parent_index) = self
            .position(parent)
            .ok_or(TreeError::NodeNotFound(parent))?;

        let mut next = self.clone();
        next.detach(id);
        next.attach(id, grandparent, parent_index + 1);
        Ok(next.settle(id))
    }

    /// Flips visibility of `id`.
    ///
    /// Going private cascades to every descendant; going public cascades to
    /// every ancestor.
    pub fn toggle_privacy(&self, id: ActionId) -> TreeResult<PrivacyChange> {
        let item = self.get(id).ok_or(TreeError::NodeNotFound(id))?;
        let before = NodeState {
            visibility: item.visibility,
            completed_at: item.completed_at,
        };
        let target = before.visibility.toggled();

        let mut affected = vec![id];
        match target {
            Visibility::Private => affected.extend(self.descendants(id)),
            Visibility::Public => affected.extend(self.ancestors(id)),
        }

        let mut next = self.clone();
        let changes = next.set_visibility(&affected, target);
        let after = NodeState {
            visibility: target,
            completed_at: before.completed_at,
        };
        Ok(PrivacyChange {
            tree: next,
            before,
            after,
            changes,
        })
    }

    /// Removes `id` with its subtree and captures where it was.
    pub fn delete(&self, id: ActionId) -> TreeResult<Deleted> {
        let node = self.subtree(id).ok_or(TreeError::NodeNotFound(id))?;
        let mut next = self.clone();
        let (parent_id, index) = next.detach(id).ok_or(TreeError::NodeNotFound(id))?;
        next.drop_slots(id);
        Ok(Deleted {
            tree: next,
            context: DeletedNodeContext {
                node,
                parent_id,
                index,
            },
        })
    }

    /// Puts a deleted subtree back at its recorded position.
    ///
    /// # Errors
    /// - `RestoreParentMissing` when the recorded parent is gone. There is
    ///   no fallback to root insertion.
    /// - `DuplicateId` when any id of the snapshot is present again.
    pub fn restore(&self, context: &DeletedNodeContext) -> TreeResult<Reshaped> {
        if let Some(parent_id) = context.parent_id {
            if !self.contains(parent_id) {
                return Err(TreeError::RestoreParentMissing {
                    node_id: context.node.id,
                    parent_id,
                });
            }
        }
        if let Some(existing) = first_present_id(self, &context.node) {
            return Err(TreeError::DuplicateId(existing));
        }

        let mut next = self.clone();
        next.graft(&context.node, context.parent_id)?;
        next.attach(context.node.id, context.parent_id, context.index);
        Ok(next.settle(context.node.id))
    }

    fn effective_visibility(
        &self,
        parent: Option<ActionId>,
        requested: Visibility,
    ) -> TreeResult<Visibility> {
        match parent {
            None => Ok(requested),
            Some(parent_id) => {
                let parent = self
                    .get(parent_id)
                    .ok_or(TreeError::NodeNotFound(parent_id))?;
                Ok(if parent.visibility.is_public() {
                    requested
                } else {
                    Visibility::Private
                })
            }
        }
    }

    fn insert_leaf(
        &self,
        id: ActionId,
        description: &str,
        parent: Option<ActionId>,
        index: usize,
        visibility: Visibility,
    ) -> TreeResult<Inserted> {
        let description = normalize_description(description)?;
        if self.contains(id) {
            return Err(TreeError::DuplicateId(id));
        }

        let mut next = self.clone();
        next.slots.insert(
            id,
            Slot {
                item: ActionItem {
                    id,
                    description,
                    completed_at: None,
                    visibility,
                },
                parent,
                children: Vec::new(),
            },
        );
        next.attach(id, parent, index);
        let uncompleted = next.recalculate_in_place();
        Ok(Inserted {
            tree: next,
            id,
            uncompleted,
        })
    }

    /// Re-establishes privacy and completion invariants after `moved` got a
    /// new parent.
    fn settle(mut self, moved: ActionId) -> Reshaped {
        let visibility_changes = self.inherit_parent_privacy(moved);
        let uncompleted = self.recalculate_in_place();
        Reshaped {
            tree: self,
            uncompleted,
            visibility_changes,
        }
    }

    fn has_open_descendant(&self, id: ActionId) -> bool {
        self.descendants(id)
            .into_iter()
            .filter_map(|descendant| self.get(descendant))
            .any(|item| !item.is_completed())
    }
}

impl Reshaped {
    fn unchanged(tree: ActionTree) -> Self {
        Self {
            tree,
            uncompleted: Vec::new(),
            visibility_changes: Vec::new(),
        }
    }
}

fn normalize_description(value: &str) -> TreeResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TreeError::EmptyDescription);
    }
    Ok(trimmed.to_string())
}

fn first_present_id(tree: &ActionTree, node: &ActionNode) -> Option<ActionId> {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if tree.contains(current.id) {
            return Some(current.id);
        }
        stack.extend(current.children.iter());
    }
    None
}
