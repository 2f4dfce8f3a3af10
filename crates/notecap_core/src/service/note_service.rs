//! Note use-case service.
//!
//! # Responsibility
//! - Run the ingestion pipeline: validate, classify, assemble, persist.
//! - Validate tag/delete requests and map unknown ids to `NoteNotFound`.
//! - Wrap export/import in the backup envelope and enforce the import limit.
//!
//! # Invariants
//! - Captured notes always have non-empty trimmed `content`.
//! - Validation failures never touch storage.
//! - Import defaults to merge mode.

use crate::classifier::{classify, word_count};
use crate::model::note::{new_note_id, Modality, Note, NoteId};
use crate::repo::note_repo::{parse_partials, NoteFilter, NoteRepository, RepoError};
use crate::repo::stats::NotesStats;
use crate::store::NoteStore;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Default upper bound on notes accepted by one import.
pub const DEFAULT_IMPORT_LIMIT: usize = 5000;

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Capture content is missing or blank.
    EmptyContent,
    /// Tag input is blank.
    InvalidTag(String),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Backup payload is not `{ "notes": [...] }`.
    InvalidImport(String),
    /// Backup payload carries more notes than allowed.
    ImportLimitExceeded { limit: usize, actual: usize },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "content is required"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidImport(details) => write!(f, "invalid import payload: {details}"),
            Self::ImportLimitExceeded { limit, actual } => {
                write!(f, "import limit exceeded ({actual} > {limit})")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl NoteServiceError {
    /// True for caller mistakes (as opposed to storage failures).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyContent
                | Self::InvalidTag(_)
                | Self::InvalidImport(_)
                | Self::ImportLimitExceeded { .. }
        )
    }
}

/// Ingestion input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaptureRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub modality: Option<Modality>,
}

impl CaptureRequest {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            modality: None,
        }
    }
}

/// How an import combines with the stored collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Merge,
    Replace,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown import mode `{other}`; expected merge|replace")),
        }
    }
}

/// Export envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub notes: Vec<Note>,
    pub exported_at: DateTime<Utc>,
}

/// Import result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub count: usize,
    pub mode: ImportMode,
}

/// Note service facade over a repository.
pub struct NoteService<S: NoteStore> {
    repo: NoteRepository<S>,
    import_limit: usize,
}

impl<S: NoteStore> NoteService<S> {
    pub fn new(repo: NoteRepository<S>) -> Self {
        Self {
            repo,
            import_limit: DEFAULT_IMPORT_LIMIT,
        }
    }

    pub fn with_import_limit(mut self, limit: usize) -> Self {
        self.import_limit = limit;
        self
    }

    pub fn import_limit(&self) -> usize {
        self.import_limit
    }

    pub fn repository(&self) -> &NoteRepository<S> {
        &self.repo
    }

    /// Classifies raw input and persists the resulting note.
    pub fn capture(&self, request: CaptureRequest) -> Result<Note, NoteServiceError> {
        if request.content.trim().is_empty() {
            return Err(NoteServiceError::EmptyContent);
        }

        let modality = request.modality.unwrap_or_default();
        let note = assemble_note(&request.content, modality, Utc::now());
        let created = self.repo.create(note)?;
        info!(
            "event=note_capture module=service status=ok id={} type={} modality={} processed={} words={}",
            created.id,
            created.kind,
            modality.as_str(),
            created.is_processed,
            word_count(&created.raw_input)
        );
        Ok(created)
    }

    pub fn list_notes(&self, filter: &NoteFilter) -> Vec<Note> {
        self.repo.list(filter)
    }

    pub fn get_note(&self, id: &str) -> Result<Note, NoteServiceError> {
        self.repo
            .get(id)
            .ok_or_else(|| NoteServiceError::NoteNotFound(id.to_string()))
    }

    /// Adds one user tag; blank tags are rejected before storage is read.
    pub fn tag_note(&self, id: &str, tag: &str) -> Result<Note, NoteServiceError> {
        if tag.trim().is_empty() {
            return Err(NoteServiceError::InvalidTag(tag.to_string()));
        }

        match self.repo.add_user_tag(id, tag)? {
            Some(note) => {
                info!("event=note_tag module=service status=ok id={id}");
                Ok(note)
            }
            None => {
                warn!("event=note_tag module=service status=not_found id={id}");
                Err(NoteServiceError::NoteNotFound(id.to_string()))
            }
        }
    }

    pub fn delete_note(&self, id: &str) -> Result<(), NoteServiceError> {
        if self.repo.delete(id)? {
            info!("event=note_delete module=service status=ok id={id}");
            Ok(())
        } else {
            warn!("event=note_delete module=service status=not_found id={id}");
            Err(NoteServiceError::NoteNotFound(id.to_string()))
        }
    }

    pub fn stats(&self) -> NotesStats {
        self.repo.stats()
    }

    pub fn export_backup(&self) -> BackupSnapshot {
        BackupSnapshot {
            notes: self.repo.export(),
            exported_at: Utc::now(),
        }
    }

    /// Imports a `{ "notes": [...] }` payload in the given mode.
    pub fn import_backup(
        &self,
        payload: Value,
        mode: ImportMode,
    ) -> Result<ImportOutcome, NoteServiceError> {
        let entries = match payload {
            Value::Object(mut object) => match object.remove("notes") {
                Some(Value::Array(entries)) => entries,
                _ => {
                    return Err(NoteServiceError::InvalidImport(
                        "notes array is required".to_string(),
                    ))
                }
            },
            _ => {
                return Err(NoteServiceError::InvalidImport(
                    "payload must be a JSON object".to_string(),
                ))
            }
        };

        if entries.len() > self.import_limit {
            warn!(
                "event=notes_import module=service status=rejected mode={} count={} limit={}",
                mode.as_str(),
                entries.len(),
                self.import_limit
            );
            return Err(NoteServiceError::ImportLimitExceeded {
                limit: self.import_limit,
                actual: entries.len(),
            });
        }

        let notes = parse_partials(entries);
        let count = match mode {
            ImportMode::Merge => self.repo.merge(notes)?,
            ImportMode::Replace => self.repo.replace_all(notes)?,
        };

        info!(
            "event=notes_import module=service status=ok mode={} count={}",
            mode.as_str(),
            count
        );
        Ok(ImportOutcome { count, mode })
    }

    /// Parses `raw` as JSON and imports it.
    pub fn import_backup_str(
        &self,
        raw: &str,
        mode: ImportMode,
    ) -> Result<ImportOutcome, NoteServiceError> {
        let payload: Value = serde_json::from_str(raw)
            .map_err(|err| NoteServiceError::InvalidImport(err.to_string()))?;
        self.import_backup(payload, mode)
    }
}

/// Builds a complete note from raw input.
///
/// `content` is the trimmed input, `raw_input` keeps it verbatim. Short
/// inputs take the fast path (see `classifier::classify`).
pub fn assemble_note(raw: &str, modality: Modality, now: DateTime<Utc>) -> Note {
    let derived = classify(raw, modality);
    Note {
        id: new_note_id(),
        kind: derived.kind,
        modality,
        content: raw.trim().to_string(),
        raw_input: raw.to_string(),
        summary: derived.summary,
        ai_tags: derived.ai_tags,
        user_tags: Vec::new(),
        specialist_data: derived.specialist_data,
        ui_format: derived.ui_format,
        is_processed: derived.is_processed,
        created_at: now,
    }
}
