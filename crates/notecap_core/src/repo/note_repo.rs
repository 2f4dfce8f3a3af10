//! Note repository over a load-all/save-all store.
//!
//! # Responsibility
//! - Own the newest-first note collection and every mutation on it.
//! - Apply filters, user-tag changes, deletes and backup replace/merge.
//!
//! # Invariants
//! - Each mutation is one read-modify-write under the exclusive lock.
//! - Reads share the lock, so they never see a half-applied mutation.
//! - Read-only calls treat unreadable or malformed storage as empty.
//! - Mutations treat a malformed document as empty but abort on a failed
//!   read, so an I/O error can never overwrite stored notes.
//! - Stored records without an id get one assigned and persisted on first
//!   load, so ids stay stable across reads.
//! - Save failures are returned to the caller; nothing is retried.

use crate::model::note::{hydrate_note, normalize_tag, Note, NoteType, PartialNote};
use crate::repo::stats::{compute_stats, NotesStats};
use crate::store::{NoteStore, StoreError};
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository write-path failure.
#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    Encode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode note collection: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Optional, AND-combined list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    /// Exact note type.
    pub kind: Option<NoteType>,
    /// Tag present in `ai_tags` or `user_tags`; trimmed and lower-cased.
    pub tag: Option<String>,
    /// Case-insensitive substring over content, summary and both tag sets.
    pub query: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
}

impl NoteFilter {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.tag.as_deref().and_then(normalize_tag).is_none()
            && self.query.as_deref().and_then(normalize_tag).is_none()
            && self.from.is_none()
            && self.to.is_none()
    }

    /// Returns whether `note` satisfies every present clause.
    ///
    /// Blank `tag`/`query` values count as absent.
    pub fn matches(&self, note: &Note) -> bool {
        if self.kind.is_some_and(|kind| note.kind != kind) {
            return false;
        }

        if let Some(tag) = self.tag.as_deref().and_then(normalize_tag) {
            if !note.has_tag(&tag) {
                return false;
            }
        }

        if let Some(needle) = self.query.as_deref().and_then(normalize_tag) {
            let haystack = format!(
                "{} {} {} {}",
                note.content,
                note.summary.as_deref().unwrap_or(""),
                note.ai_tags.join(" "),
                note.user_tags.join(" ")
            )
            .to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }

        if self.from.is_some_and(|from| note.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| note.created_at > to) {
            return false;
        }

        true
    }
}

/// Durable note collection with single-writer mutations.
pub struct NoteRepository<S: NoteStore> {
    store: S,
    lock: RwLock<()>,
}

impl<S: NoteStore> NoteRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Prepends a fully formed note and persists the collection.
    pub fn create(&self, note: Note) -> RepoResult<Note> {
        let _guard = self.lock.write();
        let mut notes = self.load_for_write()?;
        notes.insert(0, note.clone());
        self.save_notes(&notes)?;
        Ok(note)
    }

    pub fn get(&self, id: &str) -> Option<Note> {
        self.snapshot().into_iter().find(|note| note.id == id)
    }

    /// Lists notes in stored (newest-first) order.
    pub fn list(&self, filter: &NoteFilter) -> Vec<Note> {
        let notes = self.snapshot();
        if filter.is_empty() {
            return notes;
        }
        notes.into_iter().filter(|note| filter.matches(note)).collect()
    }

    /// Appends a normalized user tag.
    ///
    /// Returns `Ok(None)` for an unknown id. A blank or already present tag
    /// leaves storage untouched and still returns the note.
    pub fn add_user_tag(&self, id: &str, tag: &str) -> RepoResult<Option<Note>> {
        let _guard = self.lock.write();
        let mut notes = self.load_for_write()?;
        let Some(index) = notes.iter().position(|note| note.id == id) else {
            return Ok(None);
        };

        if let Some(tag) = normalize_tag(tag) {
            if !notes[index].user_tags.contains(&tag) {
                notes[index].user_tags.push(tag);
                self.save_notes(&notes)?;
            }
        }

        Ok(Some(notes.swap_remove(index)))
    }

    /// Removes the note with `id`; `false` when nothing matched.
    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        let _guard = self.lock.write();
        let mut notes = self.load_for_write()?;
        let before = notes.len();
        notes.retain(|note| note.id != id);
        if notes.len() == before {
            return Ok(false);
        }
        self.save_notes(&notes)?;
        Ok(true)
    }

    pub fn stats(&self) -> NotesStats {
        compute_stats(&self.snapshot())
    }

    /// Returns the full collection, unfiltered.
    pub fn export(&self) -> Vec<Note> {
        self.snapshot()
    }

    /// Discards the collection and stores the hydrated `notes` in order.
    ///
    /// Later duplicates of an id already seen in the batch are dropped.
    pub fn replace_all<I>(&self, notes: I) -> RepoResult<usize>
    where
        I: IntoIterator<Item = PartialNote>,
    {
        let now = Utc::now();
        let mut seen = HashSet::new();
        let next: Vec<Note> = notes
            .into_iter()
            .map(|partial| hydrate_note(partial, now))
            .filter(|note| seen.insert(note.id.clone()))
            .collect();

        let _guard = self.lock.write();
        self.save_notes(&next)?;
        Ok(next.len())
    }

    /// Appends hydrated notes whose id is not stored yet.
    ///
    /// Existing records win and are never overwritten. Returns the number of
    /// notes actually added.
    pub fn merge<I>(&self, notes: I) -> RepoResult<usize>
    where
        I: IntoIterator<Item = PartialNote>,
    {
        let now = Utc::now();
        let _guard = self.lock.write();
        let mut current = self.load_for_write()?;
        let mut seen: HashSet<String> = current.iter().map(|note| note.id.clone()).collect();

        let before = current.len();
        for partial in notes {
            let note = hydrate_note(partial, now);
            if seen.insert(note.id.clone()) {
                current.push(note);
            }
        }

        let added = current.len() - before;
        if added > 0 {
            self.save_notes(&current)?;
        }
        Ok(added)
    }

    /// Read-only view of the collection; never fails.
    fn snapshot(&self) -> Vec<Note> {
        {
            let _guard = self.lock.read();
            match self.read_collection() {
                Ok(loaded) if loaded.assigned_ids == 0 => return loaded.notes,
                Ok(_) => {}
                Err(err) => {
                    self.warn_unreadable(&err);
                    return Vec::new();
                }
            }
        }

        // Ids were assigned during decoding; persist them before handing out.
        let _guard = self.lock.write();
        match self.read_collection() {
            Ok(loaded) => {
                if loaded.assigned_ids > 0 {
                    if let Err(err) = self.save_notes(&loaded.notes) {
                        warn!(
                            "event=store_repair module=repo status=error backend={} assigned={} error={}",
                            self.store.kind(),
                            loaded.assigned_ids,
                            err
                        );
                    }
                }
                loaded.notes
            }
            Err(err) => {
                self.warn_unreadable(&err);
                Vec::new()
            }
        }
    }

    /// Loads the collection for a mutation. Caller holds the write lock.
    fn load_for_write(&self) -> RepoResult<Vec<Note>> {
        let loaded = match self.read_collection() {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(
                    "event=store_load module=repo status=error backend={} error_code=store_read_failed error={}",
                    self.store.kind(),
                    err
                );
                return Err(err.into());
            }
        };
        if loaded.assigned_ids > 0 {
            self.save_notes(&loaded.notes)?;
        }
        Ok(loaded.notes)
    }

    /// Reads and decodes the stored document.
    ///
    /// A malformed document decodes as empty; only store failures are errors.
    fn read_collection(&self) -> Result<LoadedNotes, StoreError> {
        let Some(raw) = self.store.load_all()? else {
            return Ok(LoadedNotes::default());
        };

        match decode_document(&raw, Utc::now()) {
            Ok(loaded) => Ok(loaded),
            Err(reason) => {
                warn!(
                    "event=store_load module=repo status=fallback backend={} error_code=store_malformed error={}",
                    self.store.kind(),
                    reason
                );
                Ok(LoadedNotes::default())
            }
        }
    }

    fn warn_unreadable(&self, err: &StoreError) {
        warn!(
            "event=store_load module=repo status=fallback backend={} error_code=store_read_failed error={}",
            self.store.kind(),
            err
        );
    }

    fn save_notes(&self, notes: &[Note]) -> RepoResult<()> {
        let started_at = Instant::now();
        let document = serde_json::to_string_pretty(notes).map_err(RepoError::Encode)?;
        match self.store.save_all(&document) {
            Ok(()) => {
                debug!(
                    "event=store_save module=repo status=ok backend={} count={} duration_ms={}",
                    self.store.kind(),
                    notes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_save module=repo status=error backend={} count={} error_code=store_write_failed error={}",
                    self.store.kind(),
                    notes.len(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

#[derive(Debug, Default)]
struct LoadedNotes {
    notes: Vec<Note>,
    /// Records that had no usable id and got a fresh one while decoding.
    assigned_ids: usize,
}

/// Parses a persisted document into hydrated notes.
///
/// The document must be a JSON array. Entries that are not objects are
/// skipped; every object is completed through `hydrate_note`.
pub fn decode_collection(raw: &str, now: DateTime<Utc>) -> Result<Vec<Note>, String> {
    decode_document(raw, now).map(|loaded| loaded.notes)
}

fn decode_document(raw: &str, now: DateTime<Utc>) -> Result<LoadedNotes, String> {
    let value: Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let Value::Array(entries) = value else {
        return Err("persisted notes document is not a JSON array".to_string());
    };

    let partials = parse_partials(entries);
    let assigned_ids = partials.iter().filter(|partial| !partial.has_id()).count();
    let notes = partials
        .into_iter()
        .map(|partial| hydrate_note(partial, now))
        .collect();
    Ok(LoadedNotes {
        notes,
        assigned_ids,
    })
}

/// Reads raw JSON entries as partial notes; non-objects are dropped.
pub fn parse_partials(entries: Vec<Value>) -> Vec<PartialNote> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<PartialNote>(entry) {
            Ok(partial) => Some(partial),
            Err(err) => {
                warn!("event=note_hydrate module=repo status=skipped error={err}");
                None
            }
        })
        .collect()
}
