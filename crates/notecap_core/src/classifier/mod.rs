//! Deterministic note classifier.
//!
//! # Responsibility
//! - Derive note type, summary, AI tags, specialist data and display hints
//!   from raw text and modality.
//! - Decide when an input is too short to be worth classifying.
//!
//! # Invariants
//! - Every function here is pure; no I/O and no shared state.
//! - Keyword rules are evaluated in `INTENT_RULES` order; first match wins.
//! - `Modality::Image` always yields `NoteType::VisualNote`.

use crate::model::note::{Modality, NoteType, SpecialistData, UiFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Inputs with fewer words than this skip full classification.
pub const SHORT_CIRCUIT_WORD_THRESHOLD: usize = 100;
pub const SUMMARY_WORD_LIMIT: usize = 24;
pub const MAX_AI_TAGS: usize = 3;
const MIN_TAG_CHARS: usize = 5;

static NON_TAG_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid tag char regex"));
static QUOTE_AUTHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-—]([^-—]*)\z").expect("valid quote author regex"));

/// Ordered keyword rule: any keyword hit maps to `kind`.
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    pub keywords: &'static [&'static str],
    pub kind: NoteType,
}

/// Keyword priority table. Order is part of the classification contract.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        keywords: &["todo", "task"],
        kind: NoteType::Todo,
    },
    IntentRule {
        keywords: &["dream"],
        kind: NoteType::Dream,
    },
    IntentRule {
        keywords: &["quote"],
        kind: NoteType::Quote,
    },
    IntentRule {
        keywords: &["idea", "startup"],
        kind: NoteType::Idea,
    },
    IntentRule {
        keywords: &["today", "felt"],
        kind: NoteType::Journal,
    },
];

/// Everything the classifier derives for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: NoteType,
    pub summary: Option<String>,
    pub ai_tags: Vec<String>,
    pub specialist_data: SpecialistData,
    pub ui_format: UiFormat,
    pub is_processed: bool,
}

/// Runs the full pipeline, honoring the short-circuit fast path.
pub fn classify(raw: &str, modality: Modality) -> Classification {
    if should_short_circuit(raw) {
        return Classification {
            kind: NoteType::Standard,
            summary: None,
            ai_tags: Vec::new(),
            specialist_data: SpecialistData::new(),
            ui_format: ui_format(NoteType::Standard),
            is_processed: false,
        };
    }

    let kind = classify_intent(raw, modality);
    Classification {
        kind,
        summary: Some(summarize(raw)),
        ai_tags: generate_tags(raw),
        specialist_data: build_specialist_data(kind, raw),
        ui_format: ui_format(kind),
        is_processed: true,
    }
}

/// Counts whitespace-delimited words of the trimmed text.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn should_short_circuit(text: &str) -> bool {
    word_count(text) < SHORT_CIRCUIT_WORD_THRESHOLD
}

pub fn classify_intent(content: &str, modality: Modality) -> NoteType {
    if modality == Modality::Image {
        return NoteType::VisualNote;
    }

    let normalized = content.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| normalized.contains(*kw)))
        .map_or(NoteType::Standard, |rule| rule.kind)
}

/// Keeps short content verbatim; longer content is cut to the first words.
pub fn summarize(content: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.len() <= SUMMARY_WORD_LIMIT {
        return content.to_string();
    }
    format!("{}...", words[..SUMMARY_WORD_LIMIT].join(" "))
}

pub fn generate_tags(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    let stripped = NON_TAG_CHARS_RE.replace_all(&lowered, "");

    let mut tags: Vec<String> = Vec::new();
    for token in stripped.split_whitespace() {
        if token.chars().count() < MIN_TAG_CHARS || tags.iter().any(|t| t == token) {
            continue;
        }
        tags.push(token.to_string());
        if tags.len() == MAX_AI_TAGS {
            break;
        }
    }
    tags
}

pub fn build_specialist_data(kind: NoteType, content: &str) -> SpecialistData {
    let normalized = content.to_lowercase();
    let mut data = SpecialistData::new();

    match kind {
        NoteType::Todo => {
            if normalized.contains("tomorrow") {
                data.insert("dueHint".to_string(), Value::from("tomorrow"));
            }
            let priority = if normalized.contains("urgent") {
                "high"
            } else {
                "normal"
            };
            data.insert("priority".to_string(), Value::from(priority));
        }
        NoteType::Quote => {
            let author = QUOTE_AUTHOR_RE
                .captures(content)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
                .filter(|value| !value.is_empty())
                .unwrap_or("unknown");
            data.insert("author".to_string(), Value::from(author));
        }
        NoteType::Journal | NoteType::Dream => {
            let sentiment = if normalized.contains("happy") {
                "positive"
            } else if normalized.contains("sad") {
                "negative"
            } else {
                "neutral"
            };
            data.insert("sentimentHint".to_string(), Value::from(sentiment));
        }
        _ => {}
    }

    data
}

pub fn ui_format(kind: NoteType) -> UiFormat {
    let (accent, typography) = match kind {
        NoteType::Dream => ("#a78bfa", "serif"),
        NoteType::Idea => ("#facc15", "sans"),
        NoteType::Todo => ("#34d399", "sans"),
        NoteType::Quote => ("#60a5fa", "serif"),
        _ => ("#71717a", "sans"),
    };
    UiFormat {
        accent: Some(accent.to_string()),
        typography: Some(typography.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, word: &str) -> String {
        vec![word; n].join(" ")
    }

    #[test]
    fn short_circuit_boundary_is_one_hundred_words() {
        assert!(should_short_circuit(&words(99, "alpha")));
        assert!(!should_short_circuit(&words(100, "alpha")));
        assert!(should_short_circuit("   "));
    }

    #[test]
    fn todo_wins_over_later_rules() {
        let kind = classify_intent("I had a dream about a task", Modality::Text);
        assert_eq!(kind, NoteType::Todo);
    }

    #[test]
    fn image_modality_overrides_keywords() {
        assert_eq!(
            classify_intent("todo dream quote", Modality::Image),
            NoteType::VisualNote
        );
    }

    #[test]
    fn journal_and_fallback() {
        assert_eq!(
            classify_intent("Today I FELT fine", Modality::Audio),
            NoteType::Journal
        );
        assert_eq!(classify_intent("plain words", Modality::Text), NoteType::Standard);
    }

    #[test]
    fn summarize_keeps_short_text_and_cuts_long_text() {
        assert_eq!(summarize("  a short note "), "  a short note ");
        let long = (1..=30).map(|i| format!("w{i}")).collect::<Vec<_>>().join("  ");
        let summary = summarize(&long);
        assert!(summary.starts_with("w1 w2 "));
        assert!(summary.ends_with("w24..."));
    }

    #[test]
    fn generate_tags_takes_first_three_long_tokens() {
        let tags = generate_tags("The wonderful elephant wandered slowly through gigantic meadows");
        assert_eq!(tags, vec!["wonderful", "elephant", "wandered"]);
    }

    #[test]
    fn generate_tags_strips_punctuation_and_dedupes() {
        let tags = generate_tags("Rust, rust! Tokio's runtime... RUNTIME sleep");
        assert_eq!(tags, vec!["tokios", "runtime", "sleep"]);
    }

    #[test]
    fn todo_specialist_data() {
        let data = build_specialist_data(NoteType::Todo, "Urgent: ship it tomorrow");
        assert_eq!(data.get("dueHint"), Some(&Value::from("tomorrow")));
        assert_eq!(data.get("priority"), Some(&Value::from("high")));

        let data = build_specialist_data(NoteType::Todo, "ship it");
        assert!(data.get("dueHint").is_none());
        assert_eq!(data.get("priority"), Some(&Value::from("normal")));
    }

    #[test]
    fn quote_author_uses_text_after_last_dash() {
        let data = build_specialist_data(NoteType::Quote, "Well-known words - Ada Lovelace ");
        assert_eq!(data.get("author"), Some(&Value::from("Ada Lovelace")));

        let data = build_specialist_data(NoteType::Quote, "Stay hungry — Steve Jobs");
        assert_eq!(data.get("author"), Some(&Value::from("Steve Jobs")));

        let data = build_specialist_data(NoteType::Quote, "no attribution here");
        assert_eq!(data.get("author"), Some(&Value::from("unknown")));
    }

    #[test]
    fn sentiment_prefers_happy_over_sad() {
        let data = build_specialist_data(NoteType::Dream, "happy then sad");
        assert_eq!(data.get("sentimentHint"), Some(&Value::from("positive")));
        let data = build_specialist_data(NoteType::Journal, "a sad day");
        assert_eq!(data.get("sentimentHint"), Some(&Value::from("negative")));
        assert!(build_specialist_data(NoteType::Idea, "happy").is_empty());
    }

    #[test]
    fn ui_format_defaults_to_neutral() {
        let format = ui_format(NoteType::Journal);
        assert_eq!(format.accent.as_deref(), Some("#71717a"));
        assert_eq!(format.typography.as_deref(), Some("sans"));
        assert_eq!(ui_format(NoteType::Dream).typography.as_deref(), Some("serif"));
    }

    #[test]
    fn fast_path_ignores_keywords() {
        let result = classify("todo: call mom tomorrow urgent", Modality::Text);
        assert_eq!(result.kind, NoteType::Standard);
        assert!(!result.is_processed);
        assert!(result.ai_tags.is_empty());
        assert!(result.specialist_data.is_empty());
        assert!(result.summary.is_none());
    }
}
