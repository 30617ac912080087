//! Arena-backed ordered action forest.
//!
//! # Responsibility
//! - Hold one user's forest as a flat id-indexed table with parent links and
//!   ordered child lists.
//! - Convert from and to the nested `ActionNode` document shape.
//! - Expose pure transforms (see `edit` and `completion`) that borrow the
//!   current tree and return a new one.
//!
//! # Invariants
//! - Every id appears once in `slots` and once in exactly one sibling list.
//! - A private item has only private descendants.
//! - A public item has only public ancestors.
//! - Walks are iterative; nesting depth never grows the call stack.

use crate::model::action::{ActionId, ActionItem, ActionNode, Visibility};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod completion;
mod edit;

pub use completion::UncompletedAction;
pub use edit::{Deleted, Inserted, NodeState, PrivacyChange, Reshaped, VisibilityChange};

/// Result type used by tree transforms.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors from tree transforms and forest loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Operation target does not exist. The input tree is left unchanged.
    NodeNotFound(ActionId),
    /// Completion was refused because a descendant is still open.
    IncompleteDescendants(ActionId),
    /// Description is blank after trim.
    EmptyDescription,
    /// Undo target parent no longer exists.
    RestoreParentMissing {
        node_id: ActionId,
        parent_id: ActionId,
    },
    /// Inserted id already exists in the tree.
    DuplicateId(ActionId),
    /// Loaded document violates a structural invariant.
    InvalidForest(String),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "action not found: {id}"),
            Self::IncompleteDescendants(id) => {
                write!(f, "complete sub-items first: {id} has open descendants")
            }
            Self::EmptyDescription => write!(f, "description must not be blank"),
            Self::RestoreParentMissing { node_id, parent_id } => write!(
                f,
                "cannot restore {node_id}: parent {parent_id} no longer exists"
            ),
            Self::DuplicateId(id) => write!(f, "action id already present: {id}"),
            Self::InvalidForest(message) => write!(f, "invalid action forest: {message}"),
        }
    }
}

impl Error for TreeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    item: ActionItem,
    parent: Option<ActionId>,
    children: Vec<ActionId>,
}

/// Ordered forest of action items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTree {
    roots: Vec<ActionId>,
    slots: HashMap<ActionId, Slot>,
}

impl ActionTree {
    /// Creates an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from the nested document shape.
    ///
    /// # Errors
    /// - `InvalidForest` for duplicate ids, a `completed`/`completedAt`
    ///   mismatch, or a public item below a private one.
    pub fn from_forest(forest: Vec<ActionNode>) -> TreeResult<Self> {
        let mut tree = Self::default();
        tree.roots = forest.iter().map(|node| node.id).collect();
        for node in &forest {
            tree.graft(node, None).map_err(|err| match err {
                TreeError::DuplicateId(id) => {
                    TreeError::InvalidForest(format!("duplicate id {id}"))
                }
                other => other,
            })?;
        }

        for (id, slot) in &tree.slots {
            let Some(parent_id) = slot.parent else {
                continue;
            };
            let parent_private = tree
                .slots
                .get(&parent_id)
                .is_some_and(|parent| parent.item.visibility.is_private());
            if parent_private && slot.item.visibility.is_public() {
                return Err(TreeError::InvalidForest(format!(
                    "public item {id} below private parent {parent_id}"
                )));
            }
        }
        Ok(tree)
    }

    /// Converts the tree back to the nested document shape.
    pub fn to_forest(&self) -> Vec<ActionNode> {
        self.build_nested(&self.roots)
    }

    /// Returns the nested subtree rooted at `id`.
    pub fn subtree(&self, id: ActionId) -> Option<ActionNode> {
        if !self.contains(id) {
            return None;
        }
        self.build_nested(&[id]).pop()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionItem> {
        self.slots.get(&id).map(|slot| &slot.item)
    }

    /// Root item ids in display order.
    pub fn roots(&self) -> &[ActionId] {
        &self.roots
    }

    /// Child ids of `id` in display order, or `None` if `id` is unknown.
    pub fn children(&self, id: ActionId) -> Option<&[ActionId]> {
        self.slots.get(&id).map(|slot| slot.children.as_slice())
    }

    /// Parent id of `id`; `None` for root items and unknown ids.
    pub fn parent(&self, id: ActionId) -> Option<ActionId> {
        self.slots.get(&id).and_then(|slot| slot.parent)
    }

    /// Returns `(parent, index)` of `id` inside its sibling list.
    pub fn position(&self, id: ActionId) -> Option<(Option<ActionId>, usize)> {
        let slot = self.slots.get(&id)?;
        let index = self
            .siblings(slot.parent)
            .iter()
            .position(|sibling| *sibling == id)?;
        Some((slot.parent, index))
    }

    /// Ancestor ids from nearest parent up to the root.
    pub fn ancestors(&self, id: ActionId) -> Vec<ActionId> {
        let mut chain = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.parent(current);
        }
        chain
    }

    /// Descendant ids of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: ActionId) -> Vec<ActionId> {
        match self.slots.get(&id) {
            Some(slot) => self.preorder(&slot.children),
            None => Vec::new(),
        }
    }

    /// All ids in document (pre-)order.
    pub fn iter_depth_first(&self) -> Vec<ActionId> {
        self.preorder(&self.roots)
    }

    /// Ancestor descriptions joined root-first, e.g. `"Home / Kitchen"`.
    pub fn breadcrumb(&self, id: ActionId) -> Option<String> {
        let mut names = self
            .ancestors(id)
            .into_iter()
            .filter_map(|ancestor| self.get(ancestor))
            .map(|item| item.description.as_str())
            .collect::<Vec<_>>();
        if names.is_empty() {
            return None;
        }
        names.reverse();
        Some(names.join(" / "))
    }

    fn siblings(&self, parent: Option<ActionId>) -> &[ActionId] {
        match parent {
            None => &self.roots,
            Some(parent_id) => self
                .slots
                .get(&parent_id)
                .map(|slot| slot.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    fn siblings_mut(&mut self, parent: Option<ActionId>) -> Option<&mut Vec<ActionId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(parent_id) => self.slots.get_mut(&parent_id).map(|slot| &mut slot.children),
        }
    }

    fn preorder(&self, tops: &[ActionId]) -> Vec<ActionId> {
        let mut order = Vec::new();
        let mut stack = tops.iter().rev().copied().collect::<Vec<_>>();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(slot) = self.slots.get(&id) {
                stack.extend(slot.children.iter().rev().copied());
            }
        }
        order
    }

    fn build_nested(&self, tops: &[ActionId]) -> Vec<ActionNode> {
        // Reverse pre-order visits every child before its parent.
        let mut built: HashMap<ActionId, ActionNode> = HashMap::new();
        for id in self.preorder(tops).into_iter().rev() {
            let Some(slot) = self.slots.get(&id) else {
                continue;
            };
            let children = slot
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(
                id,
                ActionNode {
                    id,
                    description: slot.item.description.clone(),
                    completed: slot.item.is_completed(),
                    completed_at: slot.item.completed_at,
                    visibility: slot.item.visibility,
                    children,
                },
            );
        }
        tops.iter().filter_map(|id| built.remove(id)).collect()
    }

    /// Inserts the slots of a nested subtree. The subtree root is not linked
    /// into any sibling list; callers do that with `attach`.
    fn graft(&mut self, node: &ActionNode, parent: Option<ActionId>) -> TreeResult<()> {
        let mut stack = vec![(node, parent)];
        while let Some((current, parent)) = stack.pop() {
            if current.completed != current.completed_at.is_some() {
                return Err(TreeError::InvalidForest(format!(
                    "item {} has completed={} but completedAt={:?}",
                    current.id, current.completed, current.completed_at
                )));
            }
            if self.slots.contains_key(&current.id) {
                return Err(TreeError::DuplicateId(current.id));
            }
            self.slots.insert(
                current.id,
                Slot {
                    item: ActionItem {
                        id: current.id,
                        description: current.description.clone(),
                        completed_at: current.completed_at,
                        visibility: current.visibility,
                    },
                    parent,
                    children: current.children.iter().map(|child| child.id).collect(),
                },
            );
            stack.extend(current.children.iter().map(|child| (child, Some(current.id))));
        }
        Ok(())
    }

    /// Links `id` into the sibling list of `parent` at `index` (clamped).
    fn attach(&mut self, id: ActionId, parent: Option<ActionId>, index: usize) {
        if let Some(siblings) = self.siblings_mut(parent) {
            let index = index.min(siblings.len());
            siblings.insert(index, id);
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.parent = parent;
        }
    }

    /// Unlinks `id` from its sibling list and returns its former position.
    fn detach(&mut self, id: ActionId) -> Option<(Option<ActionId>, usize)> {
        let (parent, index) = self.position(id)?;
        self.siblings_mut(parent)?.remove(index);
        Some((parent, index))
    }

    /// Removes the slots of `id` and all its descendants. `id` must already
    /// be detached.
    fn drop_slots(&mut self, id: ActionId) {
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for victim in doomed {
            self.slots.remove(&victim);
        }
    }

    /// Removes a leaf item; used by the lifecycle sweep.
    pub(crate) fn remove_leaf(&mut self, id: ActionId) -> bool {
        let is_leaf = self
            .slots
            .get(&id)
            .is_some_and(|slot| slot.children.is_empty());
        if !is_leaf || self.detach(id).is_none() {
            return false;
        }
        self.slots.remove(&id);
        true
    }

    /// Forces `id` and its subtree private when its parent is private.
    fn inherit_parent_privacy(&mut self, id: ActionId) -> Vec<VisibilityChange> {
        let parent_private = self
            .parent(id)
            .and_then(|parent| self.get(parent))
            .is_some_and(|parent| parent.visibility.is_private());
        if !parent_private {
            return Vec::new();
        }
        let mut targets = vec![id];
        targets.extend(self.descendants(id));
        self.set_visibility(&targets, Visibility::Private)
    }

    fn set_visibility(
        &mut self,
        targets: &[ActionId],
        visibility: Visibility,
    ) -> Vec<VisibilityChange> {
        let mut changes = Vec::new();
        for id in targets {
            let Some(slot) = self.slots.get_mut(id) else {
                continue;
            };
            if slot.item.visibility == visibility {
                continue;
            }
            changes.push(VisibilityChange {
                id: *id,
                from: slot.item.visibility,
                to: visibility,
                completed_at: slot.item.completed_at,
            });
            slot.item.visibility = visibility;
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionTree, TreeError};
    use crate::model::action::{ActionNode, Visibility};
    use uuid::Uuid;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn forest_roundtrip_preserves_order_and_state() {
        let forest = vec![
            ActionNode::new(id(1), "one").with_children(vec![
                ActionNode::new(id(2), "two").completed_at(10),
                ActionNode::new(id(3), "three")
                    .with_visibility(Visibility::Private)
                    .with_children(vec![
                        ActionNode::new(id(4), "four").with_visibility(Visibility::Private)
                    ]),
            ]),
            ActionNode::new(id(5), "five"),
        ];

        let tree = ActionTree::from_forest(forest.clone()).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.roots(), &[id(1), id(5)]);
        assert_eq!(tree.children(id(1)).unwrap(), &[id(2), id(3)]);
        assert_eq!(tree.parent(id(4)), Some(id(3)));
        assert_eq!(tree.to_forest(), forest);
    }

    #[test]
    fn from_forest_rejects_duplicate_ids() {
        let forest = vec![
            ActionNode::new(id(1), "a"),
            ActionNode::new(id(2), "b").with_children(vec![ActionNode::new(id(1), "again")]),
        ];
        let err = ActionTree::from_forest(forest).unwrap_err();
        assert!(matches!(err, TreeError::InvalidForest(message) if message.contains("duplicate")));
    }

    #[test]
    fn from_forest_rejects_public_child_of_private_parent() {
        let forest = vec![ActionNode::new(id(1), "secret")
            .with_visibility(Visibility::Private)
            .with_children(vec![ActionNode::new(id(2), "leak")])];
        assert!(matches!(
            ActionTree::from_forest(forest),
            Err(TreeError::InvalidForest(_))
        ));
    }

    #[test]
    fn from_forest_rejects_completion_mismatch() {
        let mut node = ActionNode::new(id(1), "half");
        node.completed = true;
        assert!(matches!(
            ActionTree::from_forest(vec![node]),
            Err(TreeError::InvalidForest(_))
        ));
    }

    #[test]
    fn breadcrumb_joins_ancestors_root_first() {
        let forest = vec![ActionNode::new(id(1), "Home").with_children(vec![
            ActionNode::new(id(2), "Kitchen").with_children(vec![ActionNode::new(id(3), "Sink")]),
        ])];
        let tree = ActionTree::from_forest(forest).unwrap();
        assert_eq!(tree.breadcrumb(id(3)).as_deref(), Some("Home / Kitchen"));
        assert_eq!(tree.breadcrumb(id(1)), None);
        assert_eq!(tree.ancestors(id(3)), vec![id(2), id(1)]);
    }

    #[test]
    fn deep_nesting_walks_iteratively() {
        let depth = 2_000u128;
        let mut node = ActionNode::new(id(depth), "leaf");
        for n in (1..depth).rev() {
            node = ActionNode::new(id(n), "level").with_children(vec![node]);
        }
        let tree = ActionTree::from_forest(vec![node]).unwrap();
        assert_eq!(tree.descendants(id(1)).len(), (depth - 1) as usize);
        assert_eq!(tree.ancestors(id(depth)).len(), (depth - 1) as usize);
        assert_eq!(tree.iter_depth_first().last(), Some(&id(depth)));
    }
}
