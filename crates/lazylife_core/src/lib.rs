//! Core domain logic for LazyLife.
//! This crate is the single source of truth for action tree invariants.

pub mod clock;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod settings;
pub mod tree;

pub use clock::{Clock, SystemClock};
pub use lifecycle::{LifecycleError, LifecycleProcessor, MidnightScheduler, SweepReport};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::action::{ActionId, ActionItem, ActionNode, DeletedNodeContext, Visibility};
pub use model::journal::{ActivityKind, ActivityStatus, JournalActivityEntry, JournalKey};
pub use model::tree_key::{MonthBucket, TreeKey, TreeKind};
pub use repo::action_repo::{
    ActionTreeRepository, RepoError, RepoResult, SqliteActionTreeRepository,
};
pub use repo::journal_repo::{JournalStore, SqliteJournalRepository};
pub use service::action_session::{ActionSession, SessionError, SessionResult};
pub use service::journal_service::JournalService;
pub use service::undo::UndoBuffer;
pub use settings::{SettingsError, TrackerSettings};
pub use tree::{ActionTree, TreeError, TreeResult};

