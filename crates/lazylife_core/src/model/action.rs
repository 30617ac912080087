//! Action item domain model.
//!
//! # Responsibility
//! - Define the persisted nested `ActionNode` shape and the in-memory
//!   `ActionItem` record stored by the arena tree.
//! - Own the two-state `Visibility` flag and its legacy boolean encoding.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - An in-memory item is completed iff `completed_at` is set.
//! - A missing `isPublic` flag in stored documents means `Public`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for every action or target item.
pub type ActionId = Uuid;

/// Visibility of an item and of the journal entries it produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn from_is_public(is_public: bool) -> Self {
        if is_public {
            Self::Public
        } else {
            Self::Private
        }
    }

    pub fn is_public(self) -> bool {
        self == Self::Public
    }

    pub fn is_private(self) -> bool {
        self == Self::Private
    }

    /// Returns the opposite visibility.
    pub fn toggled(self) -> Self {
        match self {
            Self::Public => Self::Private,
            Self::Private => Self::Public,
        }
    }

    /// Storage token used by SQLite adapters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Serde adapter that keeps the stored `isPublic: bool` wire shape while the
/// Rust side works with `Visibility`.
pub(crate) mod is_public_flag {
    use super::Visibility;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Visibility, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bool(value.is_public())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Visibility, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Older documents wrote `null` for "never set".
        let flag = Option::<bool>::deserialize(deserializer)?;
        Ok(flag.map_or(Visibility::Public, Visibility::from_is_public))
    }
}

/// Persisted nested representation of one item and its subtree.
///
/// This is the document shape stored per user and tree kind. The arena tree
/// converts from and to it at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNode {
    pub id: ActionId,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    /// Unix epoch milliseconds. Present iff `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(rename = "isPublic", with = "is_public_flag", default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub children: Vec<ActionNode>,
}

impl ActionNode {
    /// Creates an incomplete public leaf.
    pub fn new(id: ActionId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            completed: false,
            completed_at: None,
            visibility: Visibility::Public,
            children: Vec::new(),
        }
    }

    /// Marks this node completed at `epoch_ms`.
    pub fn completed_at(mut self, epoch_ms: i64) -> Self {
        self.completed = true;
        self.completed_at = Some(epoch_ms);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_children(mut self, children: Vec<ActionNode>) -> Self {
        self.children = children;
        self
    }
}

/// In-memory record of one item, without structural links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionItem {
    pub id: ActionId,
    pub description: String,
    /// Unix epoch milliseconds of the completion; `None` while incomplete.
    pub completed_at: Option<i64>,
    pub visibility: Visibility,
}

impl ActionItem {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Snapshot taken at deletion time so the subtree can be put back exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedNodeContext {
    /// Full deleted subtree.
    pub node: ActionNode,
    /// Parent at deletion time; `None` for root items.
    pub parent_id: Option<ActionId>,
    /// Index inside the parent's (or root) sibling list.
    pub index: usize,
}
