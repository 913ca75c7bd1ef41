//! Chunk files on disk, one JSON array per source document.
//!
//! [`ChunkStore`] is the only writer of the chunk directory. Saving a source replaces
//! its previous collection. Document collections live in `<file name>_chunks.json`; the
//! memory collection lives in `memory_log.json`, a name no document file can map to.
//! Loading reads every `*.json` file in file-name order so the retrieval tie-break is
//! reproducible; unreadable or unparseable files are skipped and reported in
//! [`ChunkSet::corrupt_files`] rather than failing the whole load.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::memory::types::MemoryEntry;
use crate::persist::write_json_atomic;

/// Source label of chunks produced from the memory log.
pub const MEMORY_SOURCE: &str = "memory_log";

const MEMORY_CHUNK_FILE: &str = "memory_log.json";

/// A retrievable unit of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// UUID v7, unique across all chunk files.
    pub id: String,
    /// Originating document name (or [`MEMORY_SOURCE`]).
    pub source: String,
    pub text: String,
    /// Set only on chunks re-created from memory entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_score: Option<i64>,
}

/// Every chunk currently persisted, in load order.
#[derive(Debug, Default)]
pub struct ChunkSet {
    pub chunks: Vec<TextChunk>,
    /// Files that could not be read or parsed, with the error.
    pub corrupt_files: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone)]
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the chunks for `source_name`: `<file name>_chunks.json`.
    ///
    /// The extension stays in the key, so `notes.pdf` and `notes.txt` keep separate
    /// collections.
    pub fn file_for(&self, source_name: &str) -> PathBuf {
        let name = Path::new(source_name)
            .file_name()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document");
        self.dir.join(format!("{name}_chunks.json"))
    }

    /// Persist `chunks` as the collection for `source_name`, replacing any previous one.
    pub fn save(&self, source_name: &str, chunks: &[String]) -> Result<Vec<TextChunk>> {
        let records: Vec<TextChunk> = chunks
            .iter()
            .map(|text| TextChunk {
                id: uuid::Uuid::now_v7().to_string(),
                source: source_name.to_string(),
                text: text.clone(),
                summary: None,
                impact_score: None,
            })
            .collect();

        let path = self.file_for(source_name);
        write_json_atomic(&path, &records)?;
        tracing::info!(source = source_name, chunks = records.len(), path = %path.display(), "chunks saved");
        Ok(records)
    }

    /// Turn every memory entry into a `Q:/A:` chunk so past answers become retrievable.
    pub fn save_memory_chunks(&self, entries: &[MemoryEntry]) -> Result<Vec<TextChunk>> {
        let records: Vec<TextChunk> = entries
            .iter()
            .map(|entry| TextChunk {
                id: uuid::Uuid::now_v7().to_string(),
                source: MEMORY_SOURCE.to_string(),
                text: format!("Q: {}\nA: {}", entry.question, entry.answer),
                summary: Some(entry.summary.clone()),
                impact_score: Some(entry.impact_score),
            })
            .collect();

        let path = self.dir.join(MEMORY_CHUNK_FILE);
        write_json_atomic(&path, &records)?;
        tracing::info!(chunks = records.len(), path = %path.display(), "memory chunks saved");
        Ok(records)
    }

    /// Load every persisted chunk. A missing directory is an empty store.
    pub fn load_all(&self) -> Result<ChunkSet> {
        let mut set = ChunkSet::default();
        if !self.dir.exists() {
            tracing::debug!(dir = %self.dir.display(), "chunk directory missing, nothing to load");
            return Ok(set);
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        for path in files {
            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable chunk file");
                    set.corrupt_files.push((path, e.to_string()));
                    continue;
                }
            };
            match serde_json::from_str::<Vec<TextChunk>>(&contents) {
                Ok(chunks) => {
                    let before = chunks.len();
                    set.chunks
                        .extend(chunks.into_iter().filter(|c| !c.text.trim().is_empty()));
                    tracing::debug!(path = %path.display(), chunks = before, "chunk file loaded");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable chunk file");
                    set.corrupt_files.push((path, e.to_string()));
                }
            }
        }

        Ok(set)
    }
}
