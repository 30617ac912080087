//! Journal document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Store one journal document per (user, date, visibility).
//! - Upsert by composite natural key.
//!
//! # Invariants
//! - Activities are stored as one JSON array in the order given.
//! - The free-text body is never touched by activity writes.

use crate::db::ensure_schema_ready;
use crate::model::action::Visibility;
use crate::model::journal::{JournalActivityEntry, JournalDocument, JournalKey};
use crate::repo::action_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Append/merge log of journal documents.
pub trait JournalStore {
    /// Loads the document for `key`, if any.
    fn load_document(&self, key: &JournalKey) -> RepoResult<Option<JournalDocument>>;
    /// Creates or replaces the activities of `document.key`.
    fn upsert_document(&self, document: &JournalDocument) -> RepoResult<()>;
}

impl<T: JournalStore + ?Sized> JournalStore for &T {
    fn load_document(&self, key: &JournalKey) -> RepoResult<Option<JournalDocument>> {
        (**self).load_document(key)
    }

    fn upsert_document(&self, document: &JournalDocument) -> RepoResult<()> {
        (**self).upsert_document(document)
    }
}

/// SQLite-backed journal repository.
pub struct SqliteJournalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteJournalRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["journals"])?;
        Ok(Self { conn })
    }

    /// Lists dates that have a document for `user_id`, newest first.
    pub fn list_dates(&self, user_id: &str, visibility: Visibility) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_date
             FROM journals
             WHERE user_id = ?1
               AND visibility = ?2
             ORDER BY entry_date DESC;",
        )?;
        let mut rows = stmt.query(params![user_id, visibility.as_str()])?;
        let mut dates = Vec::new();
        while let Some(row) = rows.next()? {
            dates.push(row.get(0)?);
        }
        Ok(dates)
    }
}

impl JournalStore for SqliteJournalRepository<'_> {
    fn load_document(&self, key: &JournalKey) -> RepoResult<Option<JournalDocument>> {
        let date = key.date.format(DATE_FORMAT).to_string();
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT body, activities
                 FROM journals
                 WHERE user_id = ?1
                   AND entry_date = ?2
                   AND visibility = ?3;",
                params![key.user_id, date, key.visibility.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((body, activities)) = row else {
            return Ok(None);
        };
        let entries: Vec<JournalActivityEntry> =
            serde_json::from_str(&activities).map_err(|err| {
                RepoError::InvalidData(format!(
                    "journals.activities for {}/{date}/{}: {err}",
                    key.user_id,
                    key.visibility.as_str()
                ))
            })?;
        Ok(Some(JournalDocument {
            key: key.clone(),
            body,
            entries,
        }))
    }

    fn upsert_document(&self, document: &JournalDocument) -> RepoResult<()> {
        let key = &document.key;
        let activities = serde_json::to_string(&document.entries).map_err(RepoError::Encode)?;
        self.conn.execute(
            "INSERT INTO journals (user_id, entry_date, visibility, body, activities)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (user_id, entry_date, visibility) DO UPDATE
             SET activities = excluded.activities,
                 updated_at = (strftime('%s', 'now') * 1000);",
            params![
                key.user_id,
                key.date.format(DATE_FORMAT).to_string(),
                key.visibility.as_str(),
                document.body,
                activities,
            ],
        )?;
        Ok(())
    }
}
