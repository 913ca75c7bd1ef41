//! Append-only memory log persisted as a single JSON array.
//!
//! Every append reads the whole log, pushes one entry and rewrites the file. Prior
//! records are written back as the JSON values they were read as, unknown keys and
//! original timestamp strings included, so an append never alters an earlier entry.
//!
//! Reads never fail: a missing file and a file that is not a JSON array both yield an
//! empty log, but the returned [`LogSnapshot`] records which case happened. A single
//! record that does not parse as a [`MemoryEntry`] is left out of the snapshot and
//! counted in [`LogSnapshot::skipped`]; it stays in the file. An append that finds a
//! corrupt file moves it aside to `<file>.corrupt-<timestamp>` before writing, so the
//! damaged data is kept for inspection instead of being overwritten.
//!
//! Single writer only: concurrent appends from two processes race, and the later
//! rewrite silently drops the other's entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;

use super::topic::TopicExtractor;
use super::types::{topic_text, MemoryEntry};
use crate::persist::write_json_atomic;

/// How the persisted store looked when it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    /// No file yet.
    Missing,
    Loaded,
    /// The file exists but could not be read or parsed; its entries were not returned.
    Corrupt { reason: String },
}

#[derive(Debug, Clone)]
pub struct LogSnapshot {
    pub entries: Vec<MemoryEntry>,
    pub state: StoreState,
    /// Records present in the file that could not be read as entries.
    pub skipped: usize,
}

/// The file as raw JSON records, before any per-record parsing.
enum RawLog {
    Missing,
    Records(Vec<Value>),
    Corrupt(String),
}

impl LogSnapshot {
    pub fn is_corrupt(&self) -> bool {
        matches!(self.state, StoreState::Corrupt { .. })
    }
}

pub struct MemoryLog {
    path: PathBuf,
    topics: Arc<TopicExtractor>,
}

impl MemoryLog {
    pub fn new(path: impl Into<PathBuf>, topics: Arc<TopicExtractor>) -> Self {
        Self {
            path: path.into(),
            topics,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn topics(&self) -> Arc<TopicExtractor> {
        Arc::clone(&self.topics)
    }

    /// Read the full log. Never fails; see [`StoreState`] for what was found.
    pub fn load(&self) -> LogSnapshot {
        let records = match self.read_raw() {
            RawLog::Missing => {
                return LogSnapshot {
                    entries: vec![],
                    state: StoreState::Missing,
                    skipped: 0,
                };
            }
            RawLog::Corrupt(reason) => return self.corrupt(reason),
            RawLog::Records(records) => records,
        };

        let mut entries = Vec::with_capacity(records.len());
        let mut skipped = 0;
        for (position, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<MemoryEntry>(record) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), position, error = %e, "skipping unreadable memory record");
                    skipped += 1;
                }
            }
        }

        LogSnapshot {
            entries,
            state: StoreState::Loaded,
            skipped,
        }
    }

    /// Entries only, for callers that do not care why the log is empty.
    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.load().entries
    }

    /// Record one interaction, deriving its topic from question, summary and answer.
    pub fn append(
        &self,
        question: &str,
        answer: &str,
        summary: &str,
        impact_score: i64,
    ) -> Result<MemoryEntry> {
        let topic = self
            .topics
            .topic_or_fallback(&topic_text(question, summary, answer));
        let entry = MemoryEntry::new(question, answer, summary, impact_score, topic);

        let mut records = match self.read_raw() {
            RawLog::Missing => vec![],
            RawLog::Records(records) => records,
            RawLog::Corrupt(reason) => {
                tracing::warn!(path = %self.path.display(), %reason, "memory log is corrupt, starting a new one");
                self.quarantine()?;
                vec![]
            }
        };

        records.push(serde_json::to_value(&entry).context("failed to serialize memory entry")?);
        write_json_atomic(&self.path, &records)?;

        tracing::info!(
            id = %entry.id,
            topic = %entry.topic,
            impact_score = entry.impact_score,
            total = records.len(),
            "memory entry appended"
        );
        Ok(entry)
    }

    fn read_raw(&self) -> RawLog {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RawLog::Missing,
            Err(e) => return RawLog::Corrupt(format!("unreadable: {e}")),
        };
        match serde_json::from_str::<Vec<Value>>(&contents) {
            Ok(records) => RawLog::Records(records),
            Err(e) => RawLog::Corrupt(format!("invalid JSON: {e}")),
        }
    }

    fn corrupt(&self, reason: String) -> LogSnapshot {
        tracing::warn!(path = %self.path.display(), %reason, "memory log is corrupt, treating as empty");
        LogSnapshot {
            entries: vec![],
            state: StoreState::Corrupt { reason },
            skipped: 0,
        }
    }

    /// Move a corrupt log out of the way so the next write does not destroy it.
    fn quarantine(&self) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.fZ");
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{stamp}"));
        let target = PathBuf::from(name);

        std::fs::rename(&self.path, &target).with_context(|| {
            format!(
                "failed to move corrupt memory log {} aside",
                self.path.display()
            )
        })?;
        tracing::warn!(from = %self.path.display(), to = %target.display(), "corrupt memory log preserved");
        Ok(target)
    }
}
