//! Collection-wide aggregates.

use crate::model::note::{Note, NoteType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const TOP_TAGS_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesStats {
    pub total: usize,
    pub processed: usize,
    /// Only types with at least one note appear.
    pub by_type: BTreeMap<NoteType, usize>,
    /// Most frequent tags across `ai_tags` and `user_tags`.
    pub top_tags: Vec<String>,
}

/// Counts notes per type and ranks tags.
///
/// Tags with equal counts keep the order in which they were first met while
/// walking notes in stored order (AI tags before user tags).
pub fn compute_stats(notes: &[Note]) -> NotesStats {
    let mut by_type = BTreeMap::new();
    let mut tag_counts: Vec<(&str, usize)> = Vec::new();
    let mut tag_index: HashMap<&str, usize> = HashMap::new();

    for note in notes {
        *by_type.entry(note.kind).or_insert(0) += 1;

        for tag in note.ai_tags.iter().chain(note.user_tags.iter()) {
            let slot = *tag_index.entry(tag.as_str()).or_insert_with(|| {
                tag_counts.push((tag.as_str(), 0));
                tag_counts.len() - 1
            });
            tag_counts[slot].1 += 1;
        }
    }

    // stable sort keeps first-seen order among ties
    tag_counts.sort_by(|a, b| b.1.cmp(&a.1));

    NotesStats {
        total: notes.len(),
        processed: notes.iter().filter(|note| note.is_processed).count(),
        by_type,
        top_tags: tag_counts
            .into_iter()
            .take(TOP_TAGS_LIMIT)
            .map(|(tag, _)| tag.to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::compute_stats;
    use crate::model::note::{hydrate_note, NoteType, PartialNote};
    use chrono::Utc;

    fn note(kind: NoteType, processed: bool, ai: &[&str], user: &[&str]) -> crate::model::note::Note {
        hydrate_note(
            PartialNote {
                kind: Some(kind),
                is_processed: Some(processed),
                ai_tags: Some(ai.iter().map(|t| t.to_string()).collect()),
                user_tags: Some(user.iter().map(|t| t.to_string()).collect()),
                ..PartialNote::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn empty_collection_has_zeroed_stats() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.by_type.is_empty());
        assert!(stats.top_tags.is_empty());
    }

    #[test]
    fn counts_types_and_processed() {
        let notes = vec![
            note(NoteType::Idea, true, &[], &[]),
            note(NoteType::Idea, true, &[], &[]),
            note(NoteType::Standard, false, &[], &[]),
        ];
        let stats = compute_stats(&notes);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.by_type.get(&NoteType::Idea), Some(&2));
        assert_eq!(stats.by_type.get(&NoteType::Standard), Some(&1));
        assert!(!stats.by_type.contains_key(&NoteType::Dream));
    }

    #[test]
    fn top_tags_rank_by_count_then_first_seen() {
        let notes = vec![
            note(NoteType::Standard, false, &["alpha", "beta"], &["gamma"]),
            note(NoteType::Standard, false, &["delta"], &["beta", "epsilon"]),
            note(NoteType::Standard, false, &["zeta"], &["delta"]),
        ];
        let stats = compute_stats(&notes);
        assert_eq!(
            stats.top_tags,
            vec!["beta", "delta", "alpha", "gamma", "epsilon"]
        );
    }

    #[test]
    fn by_type_serializes_with_wire_names() {
        let stats = compute_stats(&[note(NoteType::VisualNote, true, &[], &[])]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["byType"]["visual_note"], 1);
        assert_eq!(json["topTags"], serde_json::json!([]));
    }
}
