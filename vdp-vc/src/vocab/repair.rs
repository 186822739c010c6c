//! Best-effort repair of malformed JSON vocabulary documents
//!
//! Source files are hand edited or produced by text generators and are
//! frequently not well formed: byte-order marks, full-width punctuation,
//! citation markers, prose after a closing code fence, concatenated
//! fragments, trailing commas and truncated endings. [`repair`] runs a fixed
//! pipeline of structural fixes and then parses the result. The pipeline
//! only touches structure; a document that is already valid passes through
//! every stage unchanged.
//!
//! Stages that rewrite punctuation or brackets look only at text outside
//! string literals (tracked with escape handling), so a `}{` or `,]` inside a
//! definition is never altered.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

static ANNOTATION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[(?:cite|note)[^\]]*\]").expect("annotation pattern"));

static MISSING_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([}\]])(\s*)([{\[])").expect("separator pattern"));

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern"));

static BARE_TOP_LEVEL_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*"(?:[^"\\]|\\.)*"\s*:"#).expect("bare key pattern"));

const FENCE: &str = "```";

/// Repair failure: the document could not be made parseable
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("document is empty after repair")]
    Empty,

    #[error("unrecoverable JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Successfully repaired document
#[derive(Debug, Clone)]
pub struct Repaired {
    /// Text that was parsed
    pub text: String,
    /// Parsed document
    pub value: Value,
}

/// Repair `raw` and parse it
pub fn repair(raw: &str) -> Result<Repaired, RepairError> {
    let text = repair_text(raw);
    if text.trim().is_empty() {
        return Err(RepairError::Empty);
    }
    let value = serde_json::from_str(&text)?;
    Ok(Repaired { text, value })
}

/// Run every repair stage without parsing
pub fn repair_text(raw: &str) -> String {
    let text = normalize_encoding(raw);
    let text = strip_annotations(&text);
    let text = truncate_at_fence(&text);
    let text = insert_missing_separators(&text);
    let text = remove_trailing_commas(&text);
    let text = wrap_bare_key(&text);
    let text = trim_to_balanced_root(&text);
    let text = close_open_brackets(&text);
    remove_trailing_commas(&text)
}

// ========================================
// String literal tracking
// ========================================

/// Tracks whether the scan position is inside a string literal
#[derive(Debug, Default, Clone, Copy)]
struct LiteralState {
    in_string: bool,
    escape: bool,
}

impl LiteralState {
    /// Advance over `ch`; true when `ch` is structural (outside any literal)
    fn step(&mut self, ch: char) -> bool {
        if self.in_string {
            if self.escape {
                self.escape = false;
            } else if ch == '\\' {
                self.escape = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            return false;
        }
        if ch == '"' {
            self.in_string = true;
            return false;
        }
        true
    }
}

/// Apply `rewrite` to each maximal run of structural text, copying string
/// literals (quotes included) verbatim
fn map_structural<F>(text: &str, rewrite: F) -> String
where
    F: Fn(&str) -> Cow<'_, str>,
{
    let mut out = String::with_capacity(text.len());
    let mut state = LiteralState::default();
    let mut run_start = 0;
    let mut run_structural = true;

    for (i, ch) in text.char_indices() {
        let structural = state.step(ch);
        if structural != run_structural {
            let run = &text[run_start..i];
            if run_structural {
                out.push_str(&rewrite(run));
            } else {
                out.push_str(run);
            }
            run_start = i;
            run_structural = structural;
        }
    }

    let run = &text[run_start..];
    if run_structural {
        out.push_str(&rewrite(run));
    } else {
        out.push_str(run);
    }
    out
}

// ========================================
// Stages
// ========================================

/// Drop byte-order marks; full-width `，` `；` `：` between tokens become ASCII
fn normalize_encoding(text: &str) -> String {
    let text = text.replace('\u{FEFF}', "");
    map_structural(&text, |run| {
        if run.contains(['\u{FF0C}', '\u{FF1B}', '\u{FF1A}']) {
            Cow::Owned(
                run.replace('\u{FF0C}', ",")
                    .replace('\u{FF1B}', ";")
                    .replace('\u{FF1A}', ":"),
            )
        } else {
            Cow::Borrowed(run)
        }
    })
}

/// Remove `[cite...]` / `[note...]` markers anywhere in the text
fn strip_annotations(text: &str) -> String {
    ANNOTATION_MARKER.replace_all(text, "").into_owned()
}

/// Drop a leading fence opener line and cut at the next fence marker
fn truncate_at_fence(text: &str) -> String {
    let mut body = text;
    let trimmed = body.trim_start();
    if trimmed.starts_with(FENCE) {
        body = match trimmed.find('\n') {
            Some(newline) => &trimmed[newline + 1..],
            None => "",
        };
    }

    let mut state = LiteralState::default();
    for (i, ch) in body.char_indices() {
        if state.step(ch) && ch == '`' && body[i..].starts_with(FENCE) {
            return body[..i].to_string();
        }
    }
    body.to_string()
}

/// `}{`, `]{`, `}[` and `][` with only whitespace between get a comma
fn insert_missing_separators(text: &str) -> String {
    map_structural(text, |run| MISSING_SEPARATOR.replace_all(run, "$1,$2$3"))
}

/// Remove commas directly before a closing bracket
fn remove_trailing_commas(text: &str) -> String {
    map_structural(text, |run| TRAILING_COMMA.replace_all(run, "$1"))
}

/// Wrap a document that starts with `"key":` in an object
///
/// The closing brace is supplied by [`close_open_brackets`].
fn wrap_bare_key(text: &str) -> String {
    if BARE_TOP_LEVEL_KEY.is_match(text) {
        format!("{{{}", text)
    } else {
        text.to_string()
    }
}

/// Cut everything after the last closing bracket that brought nesting depth
/// back to zero, unless only whitespace follows it
///
/// Stray closers at depth zero are ignored. Text whose root never closes is
/// returned unchanged for [`close_open_brackets`] to finish.
fn trim_to_balanced_root(text: &str) -> String {
    let mut state = LiteralState::default();
    let mut depth = 0usize;
    let mut balanced_end = None;

    for (i, ch) in text.char_indices() {
        if !state.step(ch) {
            continue;
        }
        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    balanced_end = Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    match balanced_end {
        Some(end) if !text[end..].trim().is_empty() => text[..end].to_string(),
        _ => text.to_string(),
    }
}

/// Close a dangling string literal, then every bracket still open, innermost
/// first
///
/// A closer only pops the stack when it matches the innermost opener.
fn close_open_brackets(text: &str) -> String {
    let mut state = LiteralState::default();
    let mut stack: Vec<char> = Vec::new();

    for ch in text.chars() {
        if !state.step(ch) {
            continue;
        }
        match ch {
            '{' | '[' => stack.push(ch),
            '}' if stack.last() == Some(&'{') => {
                stack.pop();
            }
            ']' if stack.last() == Some(&'[') => {
                stack.pop();
            }
            _ => {}
        }
    }

    if stack.is_empty() && !state.in_string {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + stack.len() + 2);
    out.push_str(text);
    if state.in_string {
        if state.escape {
            out.push('\\');
        }
        out.push('"');
    }
    for open in stack.iter().rev() {
        out.push(if *open == '{' { '}' } else { ']' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Depth outside literals never negative, ends at zero
    fn assert_balanced(text: &str) {
        let mut state = LiteralState::default();
        let mut depth: i64 = 0;
        for ch in text.chars() {
            if !state.step(ch) {
                continue;
            }
            match ch {
                '{' | '[' => depth += 1,
                '}' | ']' => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0, "depth went negative in {}", text);
        }
        assert_eq!(depth, 0, "unbalanced output: {}", text);
    }

    #[test]
    fn test_valid_documents_are_unchanged() {
        let docs = [
            r#"{"vocabulary_units":[{"unit_id":"U1","words":[{"word":"안녕","meaning":"你好"}]}]}"#,
            r#"[{"word":"a","meaning":"b"},{"word":"c","meaning":"d"}]"#,
            "[\n  {\n    \"term\": \"x\",\n    \"definition\": \"y\"\n  }\n]\n",
            r#"{"content":{"第1课":[{"korean":"사과","chinese":"苹果，水果"}]}}"#,
            r#"[{"word":"a}{b","meaning":"[x], ] ,}","example":"say \"hi\" {"}]"#,
            r#"{"note":"escaped backslash \\","list":[]}"#,
        ];
        for doc in docs {
            let original: Value = serde_json::from_str(doc).unwrap();
            let repaired = repair(doc).unwrap();
            assert_eq!(repaired.value, original, "value changed for {}", doc);
            assert_eq!(repaired.text, doc, "text changed for {}", doc);
        }
    }

    #[test]
    fn test_missing_leading_brace_is_synthesized() {
        let raw = r#""vocabulary_units": [{"unit_id":"U1","words":[{"word":"안녕","meaning":"你好"}]}]}"#;
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.value["vocabulary_units"][0]["unit_id"], "U1");
        assert_balanced(&repaired.text);
    }

    #[test]
    fn test_trailing_comma_removed() {
        let repaired = repair(r#"[{"word":"a","meaning":"b"},]"#).unwrap();
        assert_eq!(repaired.value, json!([{"word": "a", "meaning": "b"}]));
    }

    #[test]
    fn test_truncated_document_is_closed() {
        let repaired = repair(r#"[{"word":"a","meaning":"b""#).unwrap();
        assert_eq!(repaired.text, r#"[{"word":"a","meaning":"b"}]"#);
        assert_eq!(repaired.value, json!([{"word": "a", "meaning": "b"}]));

        let repaired = repair(r#"[{"word":"a","meaning":"b"}"#).unwrap();
        assert_eq!(repaired.value, json!([{"word": "a", "meaning": "b"}]));
    }

    #[test]
    fn test_truncated_after_comma_is_closed() {
        let repaired = repair(r#"[{"word":"a","meaning":"b"},"#).unwrap();
        assert_eq!(repaired.value, json!([{"word": "a", "meaning": "b"}]));
        assert_balanced(&repaired.text);
    }

    #[test]
    fn test_dangling_string_literal_is_closed() {
        let repaired = repair(r#"[{"word":"a","meaning":"b"#).unwrap();
        assert_eq!(repaired.value, json!([{"word": "a", "meaning": "b"}]));
    }

    #[test]
    fn test_bom_and_full_width_punctuation() {
        let raw = "\u{FEFF}[{\"word\"：\"a\"，\"meaning\"：\"b，c\"}]";
        let repaired = repair(raw).unwrap();
        // Punctuation inside the literal is content and survives
        assert_eq!(repaired.value, json!([{"word": "a", "meaning": "b，c"}]));
    }

    #[test]
    fn test_annotation_markers_removed() {
        let raw = r#"[{"word":"a [cite: 12]","meaning":"b"}[cite_start]]"#;
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.value, json!([{"word": "a ", "meaning": "b"}]));

        let raw = r#"[{"word":"a","meaning":"b[NOTE 3]"}]"#;
        assert_eq!(repair(raw).unwrap().value[0]["meaning"], "b");
    }

    #[test]
    fn test_fenced_output_with_trailing_prose() {
        let raw = "```json\n[{\"word\":\"a\",\"meaning\":\"b\"}]\n```\nHope this helps! {\"not\": \"data\"}";
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.value, json!([{"word": "a", "meaning": "b"}]));

        let raw = "[{\"word\":\"a\",\"meaning\":\"b\"}]\n```\ntrailing notes";
        assert_eq!(repair(raw).unwrap().value, json!([{"word": "a", "meaning": "b"}]));
    }

    #[test]
    fn test_concatenated_fragments_get_separators() {
        let raw = "[{\"word\":\"a\",\"meaning\":\"b\"}\n{\"word\":\"c\",\"meaning\":\"d\"}]";
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.value.as_array().unwrap().len(), 2);

        let raw = r#"{"lists":[[1,2][3]]}"#;
        assert_eq!(repair(raw).unwrap().value, json!({"lists": [[1, 2], [3]]}));
    }

    #[test]
    fn test_trailing_garbage_after_root_is_dropped() {
        let raw = r#"{"content":{"u1":[{"word":"a","meaning":"b"}]}} -- end of list ]"#;
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.text, r#"{"content":{"u1":[{"word":"a","meaning":"b"}]}}"#);
    }

    #[test]
    fn test_unrecoverable_input_fails_cleanly() {
        assert!(matches!(repair("this is not json at all"), Err(RepairError::Parse(_))));
        assert!(matches!(repair("   "), Err(RepairError::Empty)));
        assert!(matches!(repair("```\n```"), Err(RepairError::Empty)));
        assert!(repair(r#"[{"word":}]"#).is_err());
    }

    #[test]
    fn test_successful_outputs_are_balanced() {
        let inputs = [
            r#"[{"word":"a","meaning":"b"},]"#,
            r#"[{"word":"a","meaning":"b""#,
            r#""content": {"u": [{"word":"x","meaning":"y"}"#,
            "[[[[",
            r#"{"a":[{"b":"}]"}"#,
        ];
        for input in inputs {
            if let Ok(repaired) = repair(input) {
                assert_balanced(&repaired.text);
            }
        }
    }
}
