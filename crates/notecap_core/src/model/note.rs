//! Note domain model and hydration policy.
//!
//! # Responsibility
//! - Define the canonical persisted `Note` record and its closed enums.
//! - Turn partial/legacy records into complete notes (`hydrate_note`).
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `ai_tags`/`user_tags` hold trimmed, lower-cased, unique, non-empty values.
//! - `ui_format` is derived from `kind` at ingestion and never edited alone.
//!
//! # See also
//! - crate::classifier

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque note identifier.
///
/// Freshly captured notes get a UUID v4 string; imported notes keep whatever
/// id the backup carried.
pub type NoteId = String;

/// Type-specific derived fields, serialized as a JSON object.
pub type SpecialistData = Map<String, Value>;

/// Closed note taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Standard,
    Dream,
    Quote,
    Todo,
    Idea,
    Thought,
    VisualNote,
    Journal,
}

impl NoteType {
    pub const ALL: [NoteType; 8] = [
        NoteType::Standard,
        NoteType::Dream,
        NoteType::Quote,
        NoteType::Todo,
        NoteType::Idea,
        NoteType::Thought,
        NoteType::VisualNote,
        NoteType::Journal,
    ];

    /// Stable wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Dream => "dream",
            Self::Quote => "quote",
            Self::Todo => "todo",
            Self::Idea => "idea",
            Self::Thought => "thought",
            Self::VisualNote => "visual_note",
            Self::Journal => "journal",
        }
    }
}

impl Display for NoteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown note type `{value}`"))
    }
}

/// Input channel the note was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Text,
    Audio,
    Image,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "audio" => Ok(Self::Audio),
            "image" => Ok(Self::Image),
            other => Err(format!(
                "unknown modality `{other}`; expected text|audio|image"
            )),
        }
    }
}

/// Display hint for note rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography: Option<String>,
}

/// Canonical persisted note record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: NoteType,
    pub modality: Modality,
    /// Trimmed text, used for search.
    pub content: String,
    /// Untrimmed original input, kept verbatim.
    pub raw_input: String,
    /// Absent for fast-pathed notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub ai_tags: Vec<String>,
    pub user_tags: Vec<String>,
    pub specialist_data: SpecialistData,
    pub ui_format: UiFormat,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Returns whether `tag` (already normalized) is in either tag set.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.ai_tags.iter().chain(self.user_tags.iter()).any(|t| t == tag)
    }
}

/// Partially populated note as found in storage or in a backup payload.
///
/// Every field is optional and tolerant: a value of the wrong JSON shape is
/// treated the same as a missing one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialNote {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<NoteType>,
    #[serde(default, deserialize_with = "lenient")]
    pub modality: Option<Modality>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub raw_input: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub ai_tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub user_tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub specialist_data: Option<SpecialistData>,
    #[serde(default, deserialize_with = "lenient")]
    pub ui_format: Option<UiFormat>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_processed: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PartialNote {
    /// Whether the record carries a usable (non-blank) id.
    pub fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

impl From<Note> for PartialNote {
    fn from(note: Note) -> Self {
        Self {
            id: Some(note.id),
            kind: Some(note.kind),
            modality: Some(note.modality),
            content: Some(note.content),
            raw_input: Some(note.raw_input),
            summary: note.summary,
            ai_tags: Some(note.ai_tags),
            user_tags: Some(note.user_tags),
            specialist_data: Some(note.specialist_data),
            ui_format: Some(note.ui_format),
            is_processed: Some(note.is_processed),
            created_at: Some(note.created_at),
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Any JSON array counts as a tag list; non-string elements are dropped.
fn lenient_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(tag) => Some(tag),
                _ => None,
            })
            .collect(),
    ))
}

/// Generates a fresh note id.
pub fn new_note_id() -> NoteId {
    Uuid::new_v4().to_string()
}

/// Fills every missing field of `partial` with its safe default.
///
/// Rules:
/// - `type` -> `standard`, `modality` -> `text`.
/// - `content` -> `""`; `rawInput` falls back to `content`.
/// - tag lists -> `[]`, normalized and deduplicated.
/// - `specialistData`/`uiFormat` -> empty.
/// - `isProcessed` -> `false`; `createdAt` -> `now`.
/// - a missing or blank `id` gets a fresh one so ids stay unique.
pub fn hydrate_note(partial: PartialNote, now: DateTime<Utc>) -> Note {
    let has_id = partial.has_id();
    let content = partial.content.unwrap_or_default();
    let raw_input = partial.raw_input.unwrap_or_else(|| content.clone());
    let id = if has_id {
        partial.id.unwrap_or_default()
    } else {
        new_note_id()
    };

    Note {
        id,
        kind: partial.kind.unwrap_or(NoteType::Standard),
        modality: partial.modality.unwrap_or_default(),
        content,
        raw_input,
        summary: partial.summary,
        ai_tags: normalize_tags(partial.ai_tags.unwrap_or_default()),
        user_tags: normalize_tags(partial.user_tags.unwrap_or_default()),
        specialist_data: partial.specialist_data.unwrap_or_default(),
        ui_format: partial.ui_format.unwrap_or_default(),
        is_processed: partial.is_processed.unwrap_or(false),
        created_at: partial.created_at.unwrap_or(now),
    }
}

/// Normalizes one tag value: trim + lower-case, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tags, keeping first-seen order.
pub fn normalize_tags<I, T>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut unique: Vec<String> = Vec::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag.as_ref()) {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
    }
    unique
}
