//! Canonical vocabulary model

use serde::{Deserialize, Serialize};

/// One normalized vocabulary entry
///
/// `term` and `definition` are never empty; the normalizer drops records
/// that would violate this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub id: String,
    pub term: String,
    pub definition: String,
    pub example: Option<String>,
    pub part_of_speech: Option<String>,
    pub related_note: Option<String>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub unit: Option<String>,
    pub book_id: String,
    pub source_file: String,
}

/// Aggregate metadata for one book directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyBook {
    pub id: String,
    pub title: String,
    pub source_files: Vec<String>,
    pub total: usize,
    pub units: Vec<String>,
}

impl VocabularyBook {
    /// Build book metadata from its loaded entries
    ///
    /// `total` and `units` are derived here and nowhere else.
    pub fn from_entries(id: &str, source_files: Vec<String>, entries: &[VocabularyEntry]) -> Self {
        let mut units: Vec<String> = Vec::new();
        for unit in entries.iter().filter_map(|e| e.unit.as_deref()) {
            if !units.iter().any(|u| u == unit) {
                units.push(unit.to_string());
            }
        }

        Self {
            id: id.to_string(),
            title: id.to_string(),
            source_files,
            total: entries.len(),
            units,
        }
    }
}
