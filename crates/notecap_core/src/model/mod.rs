//! Domain model for captured notes.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the hydration policy that completes partial/legacy records.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod note;
