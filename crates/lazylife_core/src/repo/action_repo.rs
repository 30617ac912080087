//! Action forest repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist one whole forest document per `TreeKey`.
//! - Keep SQL and JSON encoding inside the persistence boundary.
//!
//! # Invariants
//! - Writes replace the whole document (last write wins).
//! - A missing document reads as an empty forest.
//! - Read paths reject documents that violate tree invariants instead of
//!   masking them.

use crate::db::{ensure_schema_ready, DbError};
use crate::model::action::ActionNode;
use crate::model::tree_key::{TreeKey, TreeKind};
use crate::tree::ActionTree;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by tree and journal persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Stored document cannot be decoded into a valid model.
    InvalidData(String),
    /// Model cannot be encoded for storage.
    Encode(serde_json::Error),
    /// Non-SQLite backend refused the operation.
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Encode(err) => write!(f, "failed to encode document: {err}"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable whole-document store for item forests.
pub trait ActionTreeRepository {
    /// Loads the forest for `key`; empty when nothing was stored yet.
    fn load_tree(&self, key: &TreeKey) -> RepoResult<ActionTree>;
    /// Replaces the stored forest for `key`.
    fn save_tree(&self, key: &TreeKey, tree: &ActionTree) -> RepoResult<()>;
    /// Lists every stored forest key of `user_id`.
    fn list_keys(&self, user_id: &str) -> RepoResult<Vec<TreeKey>>;
}

impl<T: ActionTreeRepository + ?Sized> ActionTreeRepository for &T {
    fn load_tree(&self, key: &TreeKey) -> RepoResult<ActionTree> {
        (**self).load_tree(key)
    }

    fn save_tree(&self, key: &TreeKey, tree: &ActionTree) -> RepoResult<()> {
        (**self).save_tree(key, tree)
    }

    fn list_keys(&self, user_id: &str) -> RepoResult<Vec<TreeKey>> {
        (**self).list_keys(user_id)
    }
}

/// SQLite-backed forest repository.
pub struct SqliteActionTreeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActionTreeRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["action_trees"])?;
        Ok(Self { conn })
    }
}

impl ActionTreeRepository for SqliteActionTreeRepository<'_> {
    fn load_tree(&self, key: &TreeKey) -> RepoResult<ActionTree> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document
                 FROM action_trees
                 WHERE user_id = ?1
                   AND tree_kind = ?2
                   AND bucket = ?3;",
                params![key.user_id, key.kind.as_str(), key.kind.bucket_key()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(document) = document else {
            return Ok(ActionTree::new());
        };
        let forest: Vec<ActionNode> = serde_json::from_str(&document).map_err(|err| {
            RepoError::InvalidData(format!("action_trees.document for {key}: {err}"))
        })?;
        ActionTree::from_forest(forest)
            .map_err(|err| RepoError::InvalidData(format!("action_trees.document for {key}: {err}")))
    }

    fn save_tree(&self, key: &TreeKey, tree: &ActionTree) -> RepoResult<()> {
        let document = serde_json::to_string(&tree.to_forest()).map_err(RepoError::Encode)?;
        self.conn.execute(
            "INSERT INTO action_trees (user_id, tree_kind, bucket, document)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, tree_kind, bucket) DO UPDATE
             SET document = excluded.document,
                 updated_at = (strftime('%s', 'now') * 1000);",
            params![
                key.user_id,
                key.kind.as_str(),
                key.kind.bucket_key(),
                document
            ],
        )?;
        Ok(())
    }

    fn list_keys(&self, user_id: &str) -> RepoResult<Vec<TreeKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT tree_kind, bucket
             FROM action_trees
             WHERE user_id = ?1
             ORDER BY tree_kind ASC, bucket ASC;",
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut keys = Vec::new();
        for row in rows {
            let (kind, bucket) = row?;
            let kind = TreeKind::from_columns(&kind, &bucket).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "action_trees key `{kind}`/`{bucket}` for user {user_id}"
                ))
            })?;
            keys.push(TreeKey {
                user_id: user_id.to_string(),
                kind,
            });
        }
        Ok(keys)
    }
}
