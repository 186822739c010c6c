//! Schema normalization of parsed vocabulary documents
//!
//! Source documents come in a handful of incompatible layouts. The layout is
//! detected once per document ([`Shape::detect`]) and each record found in it
//! is mapped through a fixed alias table onto [`VocabularyEntry`].

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::model::VocabularyEntry;

/// Field aliases, in priority order
const ID_ALIASES: &[&str] = &["id", "term", "word", "korean", "word_id", "wordId"];
const TERM_ALIASES: &[&str] = &["term", "word", "korean", "vocab", "entry"];
const DEFINITION_ALIASES: &[&str] = &["definition", "meaning", "chinese", "translation", "gloss"];
const EXAMPLE_ALIASES: &[&str] = &["example", "examples", "sample", "sentence"];
const POS_ALIASES: &[&str] = &["pos", "type", "word_type", "part_of_speech"];
const RELATED_ALIASES: &[&str] = &["related", "hanja_loan", "origin", "note"];
const SYNONYM_ALIASES: &[&str] = &["synonym", "synonyms"];
const ANTONYM_ALIASES: &[&str] = &["antonym", "antonyms"];
const RECORD_UNIT_ALIASES: &[&str] = &["unit", "unit_id", "lesson"];

const LIST_SEPARATORS: &[char] = &[',', '，', '、', '/', ';', '；'];

/// Hex characters kept from the id digest
const DERIVED_ID_LEN: usize = 16;

/// Recognized document layouts, in detection priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `[{lesson|book, words: [...]}, ...]`
    Lessons,
    /// `[{chapter_title, vocabulary: [...]}, ...]`
    Chapters,
    /// `[{...entry}, ...]`
    Flat,
    /// `{vocabulary_units: [{unit_id|title, words: [...]}, ...]}`
    Units,
    /// `{content: {unit: [...], ...}}`
    Content,
}

impl Shape {
    /// Detect the layout of a parsed document; `None` when unrecognized
    pub fn detect(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => {
                let first = items.first().and_then(Value::as_object);
                if first.is_some_and(|o| o.contains_key("words")) {
                    Some(Shape::Lessons)
                } else if first.is_some_and(|o| o.contains_key("vocabulary")) {
                    Some(Shape::Chapters)
                } else {
                    Some(Shape::Flat)
                }
            }
            Value::Object(map) if map.contains_key("vocabulary_units") => Some(Shape::Units),
            Value::Object(map) if map.get("content").is_some_and(Value::is_object) => {
                Some(Shape::Content)
            }
            _ => None,
        }
    }
}

/// Normalize one parsed document into entries
///
/// Unrecognized layouts and invalid records yield nothing; this never fails.
pub fn normalize(value: &Value, book_id: &str, source_file: &str) -> Vec<VocabularyEntry> {
    let mut builder = EntryBuilder {
        book_id,
        source_file,
        position: 0,
        entries: Vec::new(),
    };

    match Shape::detect(value) {
        Some(Shape::Lessons) => {
            for group in objects(value) {
                let unit = first_text(group, &["lesson", "book"]);
                builder.push_all(group.get("words"), unit.as_deref());
            }
        }
        Some(Shape::Chapters) => {
            for group in objects(value) {
                let unit = first_text(group, &["chapter_title"]);
                builder.push_all(group.get("vocabulary"), unit.as_deref());
            }
        }
        Some(Shape::Flat) => builder.push_all(Some(value), None),
        Some(Shape::Units) => {
            for group in objects(&value["vocabulary_units"]) {
                let unit = first_text(group, &["unit_id", "title"]);
                builder.push_all(group.get("words"), unit.as_deref());
            }
        }
        Some(Shape::Content) => {
            if let Some(content) = value.get("content").and_then(Value::as_object) {
                for (unit, items) in content {
                    builder.push_all(Some(items), Some(unit.as_str()));
                }
            }
        }
        None => {}
    }

    builder.entries
}

struct EntryBuilder<'a> {
    book_id: &'a str,
    source_file: &'a str,
    /// Record index within the file, counting dropped records
    position: usize,
    entries: Vec<VocabularyEntry>,
}

impl EntryBuilder<'_> {
    fn push_all(&mut self, items: Option<&Value>, unit: Option<&str>) {
        let Some(items) = items else {
            return;
        };
        for record in objects(items) {
            let position = self.position;
            self.position += 1;
            if let Some(entry) = self.build(record, position, unit) {
                self.entries.push(entry);
            }
        }
    }

    fn build(
        &self,
        record: &Map<String, Value>,
        position: usize,
        group_unit: Option<&str>,
    ) -> Option<VocabularyEntry> {
        let term = first_text(record, TERM_ALIASES).filter(|t| !t.is_empty())?;
        let definition = first_text(record, DEFINITION_ALIASES).filter(|d| !d.is_empty())?;

        let id = first_text(record, ID_ALIASES)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| derived_id(self.book_id, self.source_file, position, &term));

        let unit = match group_unit {
            Some(unit) => Some(unit.to_string()),
            None => first_text(record, RECORD_UNIT_ALIASES),
        };

        Some(VocabularyEntry {
            id,
            term,
            definition,
            example: first_text(record, EXAMPLE_ALIASES),
            part_of_speech: first_text(record, POS_ALIASES),
            related_note: first_text(record, RELATED_ALIASES),
            synonyms: split_list(first_value(record, SYNONYM_ALIASES)),
            antonyms: split_list(first_value(record, ANTONYM_ALIASES)),
            unit,
            book_id: self.book_id.to_string(),
            source_file: self.source_file.to_string(),
        })
    }
}

/// Object items of an array value; anything else yields nothing
fn objects(value: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn first_value<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias))
        .find(|v| !v.is_null())
}

fn first_text(record: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    first_value(record, aliases).map(render_text)
}

/// Render any JSON value as display text
pub fn render_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(render_text)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Split a synonym/antonym value into trimmed, non-empty items
fn split_list(value: Option<&Value>) -> Vec<String> {
    let mut out = Vec::new();
    let mut collect = |text: &str| {
        out.extend(
            text.split(LIST_SEPARATORS)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    };

    match value {
        Some(Value::Array(items)) => {
            for item in items.iter().filter(|v| !v.is_null()) {
                collect(&render_text(item));
            }
        }
        Some(other) => collect(&render_text(other)),
        None => {}
    }
    out
}

/// Stable id for records without a natural one
pub fn derived_id(book_id: &str, source_file: &str, position: usize, term: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(book_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(source_file.as_bytes());
    hasher.update([0u8]);
    hasher.update(position.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(term.as_bytes());

    let mut hex: String = hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect();
    hex.truncate(DERIVED_ID_LEN);
    hex
}
