//! [`ResearchDesk`] wires the stores, the retrieval index and the topic extractor
//! together and exposes the operations front ends call: ingest, ask, retrieve,
//! append an interaction, and the gap/analytics/reflection reports.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::config::QuarryConfig;
use crate::documents::store::{ChunkStore, TextChunk};
use crate::documents::{self, text::DocumentReader};
use crate::embedding::{self, EmbeddingCapability};
use crate::llm::{parse_impact_score, Completion, LanguageModel};
use crate::memory::analytics::{self, AnalyticsSummary, TopicReflection};
use crate::memory::gaps::{self, GapMode, GapPolicy, TopicGap};
use crate::memory::log::{LogSnapshot, MemoryLog};
use crate::memory::topic::TopicExtractor;
use crate::memory::types::MemoryEntry;
use crate::retrieval::{RetrievalError, RetrievalIndex, ScoredChunk};

/// Result of a successful [`ResearchDesk::ask`].
#[derive(Debug)]
pub struct AskOutcome {
    pub answer: String,
    pub context: Vec<ScoredChunk>,
    pub entry: MemoryEntry,
}

pub struct ResearchDesk {
    memory: Arc<MemoryLog>,
    index: Arc<RetrievalIndex>,
    topics: Arc<TopicExtractor>,
    gap_policy: GapPolicy,
    top_k: usize,
    top_n: usize,
    max_chunk_chars: usize,
}

impl ResearchDesk {
    /// Build from config. Model-backed capabilities are loaded lazily on first use.
    pub fn from_config(config: &QuarryConfig) -> Self {
        let embedding = Arc::new(embedding::lazy_capability(&config.embedding));
        let topics = if config.topics.keyword_oracle {
            TopicExtractor::with_embedding_oracle(Arc::clone(&embedding))
        } else {
            TopicExtractor::heuristic()
        };
        Self::new(
            config,
            ChunkStore::new(config.resolved_chunk_dir()),
            MemoryLog::new(config.resolved_memory_path(), Arc::new(topics)),
            embedding,
        )
    }

    /// Build from explicit parts; the memory log's topic extractor is shared.
    pub fn new(
        config: &QuarryConfig,
        chunks: ChunkStore,
        memory: MemoryLog,
        embedding: Arc<EmbeddingCapability>,
    ) -> Self {
        let topics = memory.topics();
        Self {
            memory: Arc::new(memory),
            index: Arc::new(RetrievalIndex::new(chunks, embedding)),
            topics,
            gap_policy: GapPolicy::from(&config.gaps),
            top_k: config.retrieval.default_top_k,
            top_n: config.analytics.top_n,
            max_chunk_chars: config.retrieval.max_chunk_chars,
        }
    }

    pub fn memory(&self) -> &MemoryLog {
        &self.memory
    }

    pub fn chunk_store(&self) -> &ChunkStore {
        self.index.store()
    }

    pub fn gap_policy(&self) -> &GapPolicy {
        &self.gap_policy
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn ingest(&self, reader: &dyn DocumentReader, path: &Path) -> Result<Vec<TextChunk>> {
        documents::ingest(self.index.store(), reader, path, self.max_chunk_chars)
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, RetrievalError> {
        self.index.retrieve(query, top_k)
    }

    pub fn append_interaction(
        &self,
        question: &str,
        answer: &str,
        summary: &str,
        impact_score: i64,
    ) -> Result<MemoryEntry> {
        self.memory.append(question, answer, summary, impact_score)
    }

    pub fn snapshot(&self) -> LogSnapshot {
        self.memory.load()
    }

    pub fn analyze_gaps(&self, mode: GapMode) -> Vec<TopicGap> {
        self.analyze_gaps_in(&self.memory.entries(), mode)
    }

    /// Gap analysis over entries the caller already loaded, e.g. from [`Self::snapshot`].
    pub fn analyze_gaps_in(&self, entries: &[MemoryEntry], mode: GapMode) -> Vec<TopicGap> {
        gaps::analyze(entries, mode, &self.topics, &self.gap_policy, Utc::now())
    }

    pub fn summarize(&self) -> AnalyticsSummary {
        self.summarize_top(self.top_n)
    }

    pub fn summarize_top(&self, top_n: usize) -> AnalyticsSummary {
        analytics::summarize(&self.memory.entries(), &self.topics, top_n)
    }

    pub fn reflect(&self, min_impact: i64) -> Vec<TopicReflection> {
        analytics::reflect(&self.memory.entries(), &self.topics, min_impact, 3)
    }

    /// Convert the memory log into retrievable chunks.
    pub fn rechunk_memory(&self) -> Result<Vec<TextChunk>> {
        self.index.store().save_memory_chunks(&self.memory.entries())
    }

    /// Answer `question` from retrieved context and record the interaction.
    ///
    /// Nothing is written to memory when the language model fails to answer. A failed
    /// summary is stored as empty; a failed rating falls back to the default score.
    pub async fn ask<L: LanguageModel>(&self, llm: &L, question: &str) -> Result<AskOutcome> {
        let question = question.trim();
        anyhow::ensure!(!question.is_empty(), "question must not be empty");

        let index = Arc::clone(&self.index);
        let query = question.to_string();
        let top_k = self.top_k;
        let context = tokio::task::spawn_blocking(move || index.retrieve(&query, top_k))
            .await
            .context("retrieval task panicked")??;

        let context_text = context
            .iter()
            .map(|c| c.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        tracing::info!(chunks = context.len(), "context retrieved");

        let context_arg = (!context_text.is_empty()).then_some(context_text.as_str());
        let answer = match llm.complete(question, context_arg).await {
            Completion::Answer(text) => text,
            Completion::Failed { reason } => {
                anyhow::bail!("language model did not answer: {reason}")
            }
        };

        let summary = match llm
            .complete(&format!("Summarize this answer in 1 sentence:\n{answer}"), None)
            .await
        {
            Completion::Answer(text) => text,
            Completion::Failed { reason } => {
                tracing::warn!(%reason, "summary unavailable, storing empty summary");
                String::new()
            }
        };

        let impact_score = llm
            .complete(
                &format!("Rate the importance of this answer on a scale from 1 to 10:\n{answer}"),
                None,
            )
            .await
            .answer()
            .map(parse_impact_score)
            .unwrap_or(crate::memory::types::DEFAULT_IMPACT_SCORE);

        let memory = Arc::clone(&self.memory);
        let (q, a, s) = (question.to_string(), answer.clone(), summary);
        let entry = tokio::task::spawn_blocking(move || memory.append(&q, &a, &s, impact_score))
            .await
            .context("memory append task panicked")??;

        Ok(AskOutcome {
            answer,
            context,
            entry,
        })
    }
}
