//! Single-label topic extraction and grouping of memory entries by topic.
//!
//! [`TopicExtractor`] asks the keyword oracle for the top keyword first. When the oracle
//! is disabled, failed to initialize, errors, or returns nothing, it falls back to
//! [`fallback_topic`]: the most frequent non-stop-word token of three or more letters,
//! earliest occurrence winning ties.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;

use super::stopwords::stop_words;
use super::types::{MemoryEntry, FALLBACK_TOPIC};
use crate::capability::{Capability, CapabilityStatus};
use crate::embedding::{cosine_similarity, EmbeddingCapability, EmbeddingProvider};

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("valid word pattern"));

/// External keyword-extraction oracle.
pub trait KeywordExtractor: Send + Sync {
    /// Up to `count` keywords ranked best first, excluding `stop_words`.
    fn top_keywords(
        &self,
        text: &str,
        stop_words: &HashSet<&'static str>,
        count: usize,
    ) -> Result<Vec<(String, f32)>>;
}

/// Lowercased alphabetic tokens of length >= 3 that are not stop words, in text order.
pub fn candidate_words<'a>(
    lowered: &'a str,
    stop_words: &'a HashSet<&'static str>,
) -> impl Iterator<Item = &'a str> + 'a {
    WORD.find_iter(lowered)
        .map(|m| m.as_str())
        .filter(move |w| !stop_words.contains(w))
}

/// Deterministic frequency heuristic. Returns an empty string when no token survives.
pub fn fallback_topic(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for word in candidate_words(&lowered, stop_words()) {
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            first_seen.push(word);
        }
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for word in first_seen {
        let count = counts[word];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((word, count));
        }
    }
    best.map(|(w, _)| w.to_string()).unwrap_or_default()
}

/// KeyBERT-style extractor: candidate words ranked by embedding similarity to the text.
pub struct EmbeddingKeywordExtractor {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingKeywordExtractor {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }
}

impl KeywordExtractor for EmbeddingKeywordExtractor {
    fn top_keywords(
        &self,
        text: &str,
        stop_words: &HashSet<&'static str>,
        count: usize,
    ) -> Result<Vec<(String, f32)>> {
        let lowered = text.to_lowercase();
        let mut seen = HashSet::new();
        let candidates: Vec<&str> = candidate_words(&lowered, stop_words)
            .filter(|w| seen.insert(*w))
            .collect();
        if candidates.is_empty() || count == 0 {
            return Ok(vec![]);
        }

        let mut inputs = Vec::with_capacity(candidates.len() + 1);
        inputs.push(lowered.as_str());
        inputs.extend(candidates.iter().copied());
        let vectors = self.embedder.embed_batch(&inputs)?;
        anyhow::ensure!(
            vectors.len() == inputs.len(),
            "embedding provider returned {} vectors for {} inputs",
            vectors.len(),
            inputs.len()
        );

        let doc = &vectors[0];
        let mut scored: Vec<(String, f32)> = candidates
            .iter()
            .zip(&vectors[1..])
            .map(|(word, v)| (word.to_string(), cosine_similarity(doc, v)))
            .collect();
        // stable: equal scores keep text order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(count);
        Ok(scored)
    }
}

/// Entries sharing one topic label, in log order.
#[derive(Debug)]
pub struct TopicGroup<'a> {
    pub topic: String,
    pub entries: Vec<&'a MemoryEntry>,
}

pub struct TopicExtractor {
    oracle: Capability<dyn KeywordExtractor>,
}

impl TopicExtractor {
    pub fn new(oracle: Capability<dyn KeywordExtractor>) -> Self {
        Self { oracle }
    }

    /// Frequency heuristic only.
    pub fn heuristic() -> Self {
        Self::new(Capability::disabled("keywords", "keyword oracle disabled"))
    }

    /// Keyword oracle backed by the shared embedding capability, loaded on first use.
    pub fn with_embedding_oracle(embedding: Arc<EmbeddingCapability>) -> Self {
        Self::new(Capability::lazy("keywords", move || {
            let embedder = embedding.get().map_err(anyhow::Error::msg)?;
            let extractor: Arc<dyn KeywordExtractor> =
                Arc::new(EmbeddingKeywordExtractor::new(embedder));
            Ok(extractor)
        }))
    }

    pub fn oracle_status(&self) -> CapabilityStatus {
        self.oracle.status()
    }

    /// Topic label for `text`; empty when nothing usable remains.
    pub fn extract_topic(&self, text: &str) -> String {
        if let Ok(extractor) = self.oracle.get() {
            match extractor.top_keywords(text, stop_words(), 1) {
                Ok(keywords) => {
                    if let Some((keyword, _)) = keywords.into_iter().next() {
                        if !keyword.trim().is_empty() {
                            return keyword;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "keyword oracle failed, using frequency heuristic");
                }
            }
        }
        fallback_topic(text)
    }

    /// Like [`extract_topic`](Self::extract_topic) but never empty.
    pub fn topic_or_fallback(&self, text: &str) -> String {
        let topic = self.extract_topic(text);
        if topic.is_empty() {
            FALLBACK_TOPIC.to_string()
        } else {
            topic
        }
    }

    /// Topic of a stored entry: its recorded label, or a recomputed one for legacy entries.
    pub fn topic_of(&self, entry: &MemoryEntry) -> String {
        if entry.topic.trim().is_empty() {
            self.topic_or_fallback(&entry.topic_text())
        } else {
            entry.topic.clone()
        }
    }

    /// Group entries by topic. Groups appear in order of first occurrence.
    pub fn group_entries<'a>(&self, entries: &'a [MemoryEntry]) -> Vec<TopicGroup<'a>> {
        let mut groups: Vec<TopicGroup<'a>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for entry in entries {
            let topic = self.topic_of(entry);
            match index.get(&topic) {
                Some(&i) => groups[i].entries.push(entry),
                None => {
                    index.insert(topic.clone(), groups.len());
                    groups.push(TopicGroup {
                        topic,
                        entries: vec![entry],
                    });
                }
            }
        }
        groups
    }
}
