//! User history database operations.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::HistoryEntry;

impl Database {
    /// Append an immutable history entry.
    pub fn append_history(&self, entry: &HistoryEntry) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO user_history (
                history_id, subject_id, actor_id, kind, detail, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.history_id,
                entry.subject_id,
                entry.actor_id,
                entry.kind,
                entry.detail,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    /// List a user's history, newest first.
    pub fn list_history_for_user(&self, subject_id: &str) -> DbResult<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT history_id, subject_id, actor_id, kind, detail, created_at
            FROM user_history
            WHERE subject_id = ?
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map([subject_id], |row| {
            Ok(HistoryEntry {
                history_id: row.get(0)?,
                subject_id: row.get(1)?,
                actor_id: row.get(2)?,
                kind: row.get(3)?,
                detail: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
