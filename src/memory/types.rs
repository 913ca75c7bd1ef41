//! Memory log record types.
//!
//! [`MemoryEntry`] is one annotated question/answer interaction. Records are validated
//! at the store boundary: optional fields get their defaults here, so consumers never
//! deal with missing keys. A `null` in an optional field reads the same as a missing key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Impact score assigned when none is supplied.
pub const DEFAULT_IMPACT_SCORE: i64 = 5;

/// Topic label used when extraction yields nothing.
pub const FALLBACK_TOPIC: &str = "misc";

/// One interaction in the memory log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// UUID v7 (time-sortable).
    pub id: String,
    /// UTC creation instant. Legacy entries without an offset are read as UTC.
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub question: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: String,
    /// Conventionally 1-10; not range-checked.
    #[serde(default = "default_impact_score", deserialize_with = "null_as_default_score")]
    pub impact_score: i64,
    /// Empty only for legacy entries written before topics were recorded.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub topic: String,
}

fn default_impact_score() -> i64 {
    DEFAULT_IMPACT_SCORE
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn null_as_default_score<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(d)?.unwrap_or(DEFAULT_IMPACT_SCORE))
}

impl MemoryEntry {
    pub fn new(
        question: &str,
        answer: &str,
        summary: &str,
        impact_score: i64,
        topic: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            question: question.to_string(),
            answer: answer.to_string(),
            summary: summary.to_string(),
            impact_score,
            topic,
        }
    }

    /// Question, summary and answer joined with spaces, the input for topic extraction.
    pub fn topic_text(&self) -> String {
        topic_text(&self.question, &self.summary, &self.answer)
    }
}

pub fn topic_text(question: &str, summary: &str, answer: &str) -> String {
    format!("{question} {summary} {answer}")
}

/// RFC 3339 on write; RFC 3339 or naive ISO-8601 (assumed UTC) on read.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
