//! Repository layer over pluggable note stores.
//!
//! # Responsibility
//! - Own the durable note collection and its query/mutation contracts.
//! - Keep storage transport details behind `NoteStore`.
//!
//! # Invariants
//! - Repository APIs report unknown ids as `None`/`false`, not as errors.
//! - Only write-path failures surface as `RepoError`.

pub mod note_repo;
pub mod stats;
