//! Core domain logic for notecap.
//! This crate is the single source of truth for classification and note
//! storage invariants.

pub mod classifier;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use classifier::{classify, Classification};
pub use config::{ConfigError, CoreConfig, StorageBackend};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{
    hydrate_note, Modality, Note, NoteId, NoteType, PartialNote, SpecialistData, UiFormat,
};
pub use repo::note_repo::{NoteFilter, NoteRepository, RepoError, RepoResult};
pub use repo::stats::NotesStats;
pub use service::note_service::{
    BackupSnapshot, CaptureRequest, ImportMode, ImportOutcome, NoteService, NoteServiceError,
};
pub use store::{JsonFileStore, MemoryStore, NoteStore, SqliteStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
