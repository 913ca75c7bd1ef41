#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use quarry::capability::Capability;
use quarry::config::QuarryConfig;
use quarry::desk::ResearchDesk;
use quarry::documents::store::ChunkStore;
use quarry::embedding::{EmbeddingCapability, EmbeddingProvider};
use quarry::llm::{Completion, LanguageModel};
use quarry::memory::log::MemoryLog;
use quarry::memory::topic::TopicExtractor;
use quarry::memory::types::MemoryEntry;

/// Deterministic embedding: one dimension per vocabulary word, set when the word occurs.
/// Texts sharing more vocabulary words are more similar.
pub struct VocabEmbedder {
    vocab: Vec<&'static str>,
    pub calls: AtomicUsize,
}

impl VocabEmbedder {
    pub fn new(vocab: &[&'static str]) -> Self {
        Self {
            vocab: vocab.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingProvider for VocabEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lowered = text.to_lowercase();
        Ok(self
            .vocab
            .iter()
            .map(|w| if lowered.contains(w) { 1.0 } else { 0.0 })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.vocab.len()
    }
}

/// Embedding provider whose every call fails.
pub struct BrokenEmbedder;

impl EmbeddingProvider for BrokenEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("inference backend crashed")
    }
}

pub fn ready(provider: Arc<dyn EmbeddingProvider>) -> Arc<EmbeddingCapability> {
    Arc::new(Capability::ready("embedding", provider))
}

pub fn unavailable() -> Arc<EmbeddingCapability> {
    Arc::new(Capability::disabled("embedding", "model files missing"))
}

/// Config rooted in `dir`, heuristic topics only.
pub fn test_config(dir: &Path) -> QuarryConfig {
    let mut config = QuarryConfig::default();
    config.storage.data_dir = dir.to_string_lossy().into_owned();
    config.topics.keyword_oracle = false;
    config
}

pub fn memory_log(dir: &Path) -> MemoryLog {
    MemoryLog::new(
        test_config(dir).resolved_memory_path(),
        Arc::new(TopicExtractor::heuristic()),
    )
}

pub fn test_desk(dir: &Path, embedding: Arc<EmbeddingCapability>) -> ResearchDesk {
    let config = test_config(dir);
    ResearchDesk::new(
        &config,
        ChunkStore::new(config.resolved_chunk_dir()),
        memory_log(dir),
        embedding,
    )
}

/// An entry with a fixed topic whose timestamp is `age` before `now`.
pub fn entry_aged(
    question: &str,
    topic: &str,
    impact: i64,
    age: Duration,
    now: DateTime<Utc>,
) -> MemoryEntry {
    let mut entry = MemoryEntry::new(question, "answer", "summary", impact, topic.into());
    entry.timestamp = now - age;
    entry
}

/// Language model that replays scripted completions in order and records each prompt.
/// Once the script runs out every call fails.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Completion>>,
    pub prompts: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Completion>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(vec![]),
        }
    }

    pub fn answering(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| Completion::Answer(r.to_string()))
                .collect(),
        )
    }

    pub fn prompts(&self) -> Vec<(String, Option<String>)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, context: Option<&str>) -> Completion {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), context.map(str::to_string)));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Completion::Failed {
                reason: "script exhausted".into(),
            })
    }
}

pub fn failed(reason: &str) -> Completion {
    Completion::Failed {
        reason: reason.into(),
    }
}
