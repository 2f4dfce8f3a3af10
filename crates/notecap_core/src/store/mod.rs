//! Persistence backends for the note collection.
//!
//! # Responsibility
//! - Define the load-all/save-all contract the repository is built on.
//! - Provide JSON-file, SQLite and in-memory implementations.
//!
//! # Invariants
//! - A backend stores the whole collection as one opaque document.
//! - `save_all` either persists the full document or leaves the previous one
//!   untouched.
//! - `load_all` returns `Ok(None)` when nothing has been stored yet.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod json_file;
mod memory;
mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Transport-level failure of a persistence backend.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "note store I/O error: {err}"),
            Self::Db(err) => write!(f, "note store database error: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable home for the serialized note collection.
pub trait NoteStore: Send + Sync {
    /// Short backend label used in log events.
    fn kind(&self) -> &'static str;
    /// Reads the whole persisted document.
    fn load_all(&self) -> StoreResult<Option<String>>;
    /// Atomically replaces the whole persisted document.
    fn save_all(&self, document: &str) -> StoreResult<()>;
}

impl<S: NoteStore + ?Sized> NoteStore for Box<S> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn load_all(&self) -> StoreResult<Option<String>> {
        (**self).load_all()
    }

    fn save_all(&self, document: &str) -> StoreResult<()> {
        (**self).save_all(document)
    }
}
