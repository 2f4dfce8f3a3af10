//! SQLite backend keeping the collection in a single row.

use super::{NoteStore, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;

pub const DB_FILE_NAME: &str = "notecap.db";
const COLLECTION_NAME: &str = "notes";

/// Stores the serialized collection in `note_documents`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (and migrates) `<dir>/notecap.db`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(dir.as_ref().join(DB_FILE_NAME))?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl NoteStore for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn load_all(&self) -> StoreResult<Option<String>> {
        let conn = self.conn.lock();
        let body = conn
            .query_row(
                "SELECT body FROM note_documents WHERE name = ?1;",
                [COLLECTION_NAME],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn save_all(&self, document: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO note_documents (name, body, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(name) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at;",
            params![COLLECTION_NAME, document],
        )?;
        tx.commit()?;
        Ok(())
    }
}
