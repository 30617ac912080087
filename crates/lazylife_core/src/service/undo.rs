//! Single-slot undo for deletions.

use crate::model::action::DeletedNodeContext;

/// Holds at most one pending deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoBuffer {
    slot: Option<DeletedNodeContext>,
}

impl UndoBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `context`, replacing any older one.
    pub fn capture(&mut self, context: DeletedNodeContext) {
        self.slot = Some(context);
    }

    pub fn peek(&self) -> Option<&DeletedNodeContext> {
        self.slot.as_ref()
    }

    pub fn take(&mut self) -> Option<DeletedNodeContext> {
        self.slot.take()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
