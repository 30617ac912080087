//! Per-user action tree session.
//!
//! # Responsibility
//! - Route UI-level edits through the pure tree transforms.
//! - Persist every accepted edit and keep the journal consistent with
//!   completion and visibility changes.
//! - Own the single undo slot and run the session-start sweep.
//!
//! # Invariants
//! - The in-memory tree only advances after the repository write succeeds,
//!   so it never runs ahead of durable state.
//! - Any successful edit other than delete/undo clears the undo slot.
//! - Journal side effects run after the tree write. Their failures do not
//!   fail the edit; they are logged and queued as warnings.

use crate::clock::{local_date, Clock};
use crate::lifecycle::{LifecycleError, LifecycleProcessor, SweepReport};
use crate::model::action::{ActionId, DeletedNodeContext, Visibility};
use crate::model::journal::JournalKey;
use crate::model::tree_key::{TreeKey, TreeKind};
use crate::repo::action_repo::{ActionTreeRepository, RepoError, RepoResult};
use crate::repo::journal_repo::JournalStore;
use crate::service::journal_service::{completion_entry, JournalService};
use crate::service::undo::UndoBuffer;
use crate::settings::TrackerSettings;
use crate::tree::{ActionTree, Reshaped, TreeError, UncompletedAction, VisibilityChange};
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors from session operations.
#[derive(Debug)]
pub enum SessionError {
    /// Transform refused the edit; nothing was written.
    Tree(TreeError),
    /// Tree write failed; in-memory state was kept at the last durable tree.
    Persist(RepoError),
    Lifecycle(LifecycleError),
    /// Undo requested with an empty slot.
    NothingToUndo,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Persist(err) => write!(f, "failed to save actions: {err}"),
            Self::Lifecycle(err) => write!(f, "{err}"),
            Self::NothingToUndo => write!(f, "nothing to undo"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Persist(err) => Some(err),
            Self::Lifecycle(err) => Some(err),
            Self::NothingToUndo => None,
        }
    }
}

impl From<TreeError> for SessionError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<LifecycleError> for SessionError {
    fn from(value: LifecycleError) -> Self {
        Self::Lifecycle(value)
    }
}

/// One user's editing session over one stored forest.
pub struct ActionSession<R: ActionTreeRepository, J: JournalStore, C: Clock> {
    key: TreeKey,
    timezone: Tz,
    trees: R,
    journal: JournalService<J>,
    clock: C,
    tree: ActionTree,
    undo: UndoBuffer,
    warnings: Vec<String>,
}

impl<R: ActionTreeRepository, J: JournalStore, C: Clock> ActionSession<R, J, C> {
    /// Opens the session and runs the session-start sweep.
    pub fn open(
        settings: &TrackerSettings,
        kind: TreeKind,
        trees: R,
        journal: J,
        clock: C,
    ) -> SessionResult<Self> {
        let mut session = Self {
            key: TreeKey {
                user_id: settings.user_id.clone(),
                kind,
            },
            timezone: settings.timezone,
            trees,
            journal: JournalService::new(journal),
            clock,
            tree: ActionTree::new(),
            undo: UndoBuffer::new(),
            warnings: Vec::new(),
        };
        let report = session.run_daily_sweep()?;
        info!(
            "event=session_open module=session status=ok key={} items={} archived={}",
            session.key,
            session.tree.len(),
            report.archived.len()
        );
        Ok(session)
    }

    /// Runs the lifecycle sweep and adopts the pruned tree.
    pub fn run_daily_sweep(&mut self) -> SessionResult<SweepReport> {
        let processor = LifecycleProcessor::new(&self.trees, self.journal.store(), self.timezone);
        let report = processor.run(&self.key, self.clock.now_ms())?;
        self.tree = report.tree.clone();
        self.undo.clear();
        Ok(report)
    }

    pub fn tree(&self) -> &ActionTree {
        &self.tree
    }

    pub fn key(&self) -> &TreeKey {
        &self.key
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn pending_undo(&self) -> Option<&DeletedNodeContext> {
        self.undo.peek()
    }

    /// Drains journal warnings collected since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn add(
        &mut self,
        description: &str,
        parent: Option<ActionId>,
        visibility: Visibility,
    ) -> SessionResult<ActionId> {
        let inserted = self.tree.add(description, parent, visibility)?;
        self.commit_edit("add", inserted.tree)?;
        self.retract_uncompleted(&inserted.uncompleted);
        Ok(inserted.id)
    }

    pub fn add_after(
        &mut self,
        after: ActionId,
        description: &str,
        visibility: Visibility,
    ) -> SessionResult<ActionId> {
        let inserted = self.tree.add_after(after, description, visibility)?;
        self.commit_edit("add_after", inserted.tree)?;
        self.retract_uncompleted(&inserted.uncompleted);
        Ok(inserted.id)
    }

    /// Flips completion of `id` and returns the new completed state.
    ///
    /// Completing writes a journal entry for today; un-completing retracts
    /// the entry written for the old completion date.
    pub fn toggle(&mut self, id: ActionId) -> SessionResult<bool> {
        let now = self.clock.now_ms();
        let next = self.tree.toggle(id, now)?;
        let Some(before) = self.tree.get(id).cloned() else {
            return Err(SessionError::Tree(TreeError::NodeNotFound(id)));
        };
        let breadcrumb = next.breadcrumb(id);
        self.commit_edit("toggle", next)?;

        let kind = self.key.kind.activity_kind();
        match before.completed_at {
            None => {
                let key = self.journal_key(now, before.visibility);
                let entry = completion_entry(
                    id,
                    kind,
                    &before.description,
                    now,
                    before.visibility,
                    breadcrumb,
                );
                let result = self.journal.append(&key, vec![entry]).map(|_| ());
                self.note_journal_result("append", result);
                Ok(true)
            }
            Some(old_completed_at) => {
                let key = self.journal_key(old_completed_at, before.visibility);
                let result = self.journal.retract(&key, &[id]).map(|_| ());
                self.note_journal_result("retract", result);
                Ok(false)
            }
        }
    }

    pub fn update_text(&mut self, id: ActionId, text: &str) -> SessionResult<()> {
        let next = self.tree.update_text(id, text)?;
        self.commit_edit("update_text", next)
    }

    pub fn move_up(&mut self, id: ActionId) -> SessionResult<()> {
        let next = self.tree.move_up(id)?;
        self.commit_edit("move_up", next)
    }

    pub fn move_down(&mut self, id: ActionId) -> SessionResult<()> {
        let next = self.tree.move_down(id)?;
        self.commit_edit("move_down", next)
    }

    pub fn indent(&mut self, id: ActionId) -> SessionResult<()> {
        let reshaped = self.tree.indent(id)?;
        self.commit_reshape("indent", reshaped)
    }

    pub fn outdent(&mut self, id: ActionId) -> SessionResult<()> {
        let reshaped = self.tree.outdent(id)?;
        self.commit_reshape("outdent", reshaped)
    }

    /// Flips visibility of `id` and returns the new visibility. Journal
    /// entries of completed items follow them to the matching document.
    pub fn toggle_privacy(&mut self, id: ActionId) -> SessionResult<Visibility> {
        let change = self.tree.toggle_privacy(id)?;
        self.commit_edit("toggle_privacy", change.tree)?;
        self.relocate_entries(&change.changes);
        Ok(change.after.visibility)
    }

    /// Deletes `id` with its subtree and remembers it for one undo.
    pub fn delete(&mut self, id: ActionId) -> SessionResult<()> {
        let deleted = self.tree.delete(id)?;
        self.persist("delete", deleted.tree)?;
        self.undo.capture(deleted.context);
        Ok(())
    }

    /// Restores the most recent deletion and returns its id.
    ///
    /// # Errors
    /// - `NothingToUndo` when no deletion is pending.
    /// - `Tree(RestoreParentMissing)` when the old parent is gone; the slot
    ///   is dropped since it can never apply again.
    /// - `Persist` when the write fails; the deletion stays pending.
    pub fn undo_delete(&mut self) -> SessionResult<ActionId> {
        let context = self.undo.take().ok_or(SessionError::NothingToUndo)?;
        let reshaped = self.tree.restore(&context)?;
        if let Err(err) = self.persist("undo_delete", reshaped.tree) {
            self.undo.capture(context);
            return Err(err);
        }
        self.retract_uncompleted(&reshaped.uncompleted);
        self.relocate_entries(&reshaped.visibility_changes);
        Ok(context.node.id)
    }

    fn commit_reshape(&mut self, op: &'static str, reshaped: Reshaped) -> SessionResult<()> {
        self.commit_edit(op, reshaped.tree)?;
        self.retract_uncompleted(&reshaped.uncompleted);
        self.relocate_entries(&reshaped.visibility_changes);
        Ok(())
    }

    fn commit_edit(&mut self, op: &'static str, next: ActionTree) -> SessionResult<()> {
        self.persist(op, next)?;
        self.undo.clear();
        Ok(())
    }

    fn persist(&mut self, op: &'static str, next: ActionTree) -> SessionResult<()> {
        if let Err(err) = self.trees.save_tree(&self.key, &next) {
            error!(
                "event=action_edit module=session status=error op={op} key={} error={err}",
                self.key
            );
            return Err(SessionError::Persist(err));
        }
        self.tree = next;
        debug!(
            "event=action_edit module=session status=ok op={op} key={} items={}",
            self.key,
            self.tree.len()
        );
        Ok(())
    }

    fn journal_key(&self, epoch_ms: i64, visibility: Visibility) -> JournalKey {
        JournalKey::new(
            self.key.user_id.clone(),
            local_date(self.timezone, epoch_ms),
            visibility,
        )
    }

    fn retract_uncompleted(&mut self, uncompleted: &[UncompletedAction]) {
        let mut by_key: BTreeMap<JournalKey, Vec<ActionId>> = BTreeMap::new();
        for item in uncompleted {
            by_key
                .entry(self.journal_key(item.old_completed_at, item.visibility))
                .or_default()
                .push(item.id);
        }
        for (key, ids) in by_key {
            let result = self.journal.retract(&key, &ids).map(|_| ());
            self.note_journal_result("retract", result);
        }
    }

    fn relocate_entries(&mut self, changes: &[VisibilityChange]) {
        for change in changes {
            let Some(completed_at) = change.completed_at else {
                continue;
            };
            let from = self.journal_key(completed_at, change.from);
            let to = self.journal_key(completed_at, change.to);
            let result = self.journal.relocate(&from, &to, change.id).map(|_| ());
            self.note_journal_result("relocate", result);
        }
    }

    fn note_journal_result(&mut self, op: &'static str, result: RepoResult<()>) {
        if let Err(err) = result {
            warn!(
                "event=journal_sync module=session status=error op={op} key={} error={err}",
                self.key
            );
            self.warnings.push(format!("journal {op} failed: {err}"));
        }
    }
}
