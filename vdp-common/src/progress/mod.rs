//! Learner progress model
//!
//! A learner marks each word of a book as known, fuzzy or unknown. Writes go
//! to the low-latency cache store first (see [`writer`]) and are reconciled
//! into the durable store by the syncer. Presentation reads merge both
//! tiers with the cache taking precedence (see [`merge`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

pub mod keys;
pub mod merge;
pub mod writer;

pub use merge::merged_statuses;
pub use writer::ProgressWriter;

/// Learner's self-assessed mastery of one word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Known,
    Fuzzy,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Known => "known",
            Status::Fuzzy => "fuzzy",
            Status::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "known" => Ok(Status::Known),
            "fuzzy" => Ok(Status::Fuzzy),
            "unknown" => Ok(Status::Unknown),
            other => Err(Error::InvalidInput(format!("Unrecognized status: {}", other))),
        }
    }
}

/// `bookId:wordId` field key shared by the status and timestamp hashes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressField {
    pub book_id: String,
    pub word_id: String,
}

impl ProgressField {
    pub fn new(book_id: impl Into<String>, word_id: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            word_id: word_id.into(),
        }
    }

    /// Hash field name as stored in the cache
    pub fn to_field(&self) -> String {
        format!("{}:{}", self.book_id, self.word_id)
    }

    /// Split a hash field at its first `:`
    ///
    /// Word ids may themselves contain `:`; book ids (directory names) are
    /// assumed not to. Returns `None` when either part is empty.
    pub fn parse(field: &str) -> Option<Self> {
        let (book_id, word_id) = field.split_once(':')?;
        if book_id.is_empty() || word_id.is_empty() {
            return None;
        }
        Some(Self::new(book_id, word_id))
    }
}

impl fmt::Display for ProgressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.book_id, self.word_id)
    }
}

/// One durable row of learner progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: i64,
    pub book_id: String,
    pub word_id: String,
    pub status: Status,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        for status in [Status::Known, Status::Fuzzy, Status::Unknown] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
            assert_eq!(status.to_string(), status.as_str());
        }
        assert!("KNOWN".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Fuzzy).unwrap(), "\"fuzzy\"");
        let parsed: Status = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(parsed, Status::Unknown);
    }

    #[test]
    fn test_field_splits_at_first_colon() {
        let field = ProgressField::parse("topik1:w:42").unwrap();
        assert_eq!(field.book_id, "topik1");
        assert_eq!(field.word_id, "w:42");
        assert_eq!(field.to_field(), "topik1:w:42");
    }

    #[test]
    fn test_field_rejects_malformed() {
        assert!(ProgressField::parse("no-separator").is_none());
        assert!(ProgressField::parse(":w1").is_none());
        assert!(ProgressField::parse("topik1:").is_none());
    }
}
