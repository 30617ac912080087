//! Daily lifecycle processing.
//!
//! # Responsibility
//! - Run the read → sweep → journal → write cycle for one stored forest.
//! - Sweep every stored forest of a user in one pass (`run_all`).
//! - Re-arm itself at each local midnight through `MidnightScheduler`.
//!
//! # Invariants
//! - One run performs at most one tree read and one tree write.
//! - Journal batches are written before the pruned tree. An interruption
//!   between the two re-archives the same items on the next run; journal
//!   reads collapse them by id.
//! - A run that archives nothing writes nothing.

mod scheduler;
mod sweep;

pub use scheduler::MidnightScheduler;
pub use sweep::{sweep, ArchivedAction, SweepOutcome};

use crate::clock::start_of_local_day_ms;
use crate::model::action::ActionId;
use crate::model::journal::JournalKey;
use crate::model::tree_key::TreeKey;
use crate::repo::action_repo::{ActionTreeRepository, RepoError};
use crate::repo::journal_repo::JournalStore;
use crate::service::journal_service::{group_archived, JournalService};
use crate::tree::ActionTree;
use chrono_tz::Tz;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from one lifecycle run.
#[derive(Debug)]
pub enum LifecycleError {
    /// Reading or writing the forest failed.
    Tree(RepoError),
    /// Appending an archive batch failed; the tree was not rewritten.
    Journal(RepoError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "lifecycle tree access failed: {err}"),
            Self::Journal(err) => write!(f, "lifecycle journal append failed: {err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Journal(err) => Some(err),
        }
    }
}

/// Summary of one lifecycle run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Forest after the run; equal to the stored one.
    pub tree: ActionTree,
    pub archived: Vec<ArchivedAction>,
    pub ghosted: Vec<ActionId>,
    /// Number of journal documents appended to.
    pub journal_batches: usize,
}

/// Lifecycle processor over a tree repository and a journal store.
pub struct LifecycleProcessor<R: ActionTreeRepository, J: JournalStore> {
    trees: R,
    journal: JournalService<J>,
    timezone: Tz,
}

impl<R: ActionTreeRepository, J: JournalStore> LifecycleProcessor<R, J> {
    pub fn new(trees: R, journal: J, timezone: Tz) -> Self {
        Self {
            trees,
            journal: JournalService::new(journal),
            timezone,
        }
    }

    /// Runs one sweep of the forest at `key` as of `now_ms`.
    pub fn run(&self, key: &TreeKey, now_ms: i64) -> Result<SweepReport, LifecycleError> {
        let started_at = Instant::now();
        let tree = self.trees.load_tree(key).map_err(|err| {
            error!("event=lifecycle_sweep module=lifecycle status=error stage=load key={key} error={err}");
            LifecycleError::Tree(err)
        })?;

        let cutoff = start_of_local_day_ms(self.timezone, now_ms);
        let outcome = sweep(&tree, self.timezone, cutoff);
        if outcome.archived.is_empty() {
            info!(
                "event=lifecycle_sweep module=lifecycle status=ok key={key} archived=0 ghosted={} duration_ms={}",
                outcome.ghosted.len(),
                started_at.elapsed().as_millis()
            );
            return Ok(SweepReport {
                tree: outcome.tree,
                archived: Vec::new(),
                ghosted: outcome.ghosted,
                journal_batches: 0,
            });
        }

        let groups = group_archived(&outcome.archived, key.kind.activity_kind(), self.timezone);
        let journal_batches = groups.len();
        for ((date, visibility), entries) in groups {
            let journal_key = JournalKey::new(key.user_id.clone(), date, visibility);
            self.journal.append(&journal_key, entries).map_err(|err| {
                error!(
                    "event=lifecycle_sweep module=lifecycle status=error stage=journal key={key} date={date} error={err}"
                );
                LifecycleError::Journal(err)
            })?;
        }

        self.trees.save_tree(key, &outcome.tree).map_err(|err| {
            error!("event=lifecycle_sweep module=lifecycle status=error stage=save key={key} error={err}");
            LifecycleError::Tree(err)
        })?;

        info!(
            "event=lifecycle_sweep module=lifecycle status=ok key={key} archived={} ghosted={} batches={} duration_ms={}",
            outcome.archived.len(),
            outcome.ghosted.len(),
            journal_batches,
            started_at.elapsed().as_millis()
        );
        Ok(SweepReport {
            tree: outcome.tree,
            archived: outcome.archived,
            ghosted: outcome.ghosted,
            journal_batches,
        })
    }

    /// Sweeps every stored forest of `user_id`, stopping at the first failure.
    pub fn run_all(
        &self,
        user_id: &str,
        now_ms: i64,
    ) -> Result<Vec<(TreeKey, SweepReport)>, LifecycleError> {
        let keys = self.trees.list_keys(user_id).map_err(|err| {
            error!("event=lifecycle_sweep module=lifecycle status=error stage=list user={user_id} error={err}");
            LifecycleError::Tree(err)
        })?;
        let mut reports = Vec::with_capacity(keys.len());
        for key in keys {
            let report = self.run(&key, now_ms)?;
            reports.push((key, report));
        }
        Ok(reports)
    }
}
