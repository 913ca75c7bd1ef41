//! Personal research assistant: retrieval over ingested documents plus an annotated,
//! append-only log of past questions that is mined for topic coverage and gaps.
//!
//! # Pipeline
//!
//! 1. **Ingest**: document text is cleaned and packed into sentence-aligned chunks of
//!    bounded size, stored as one JSON file per document.
//! 2. **Retrieve**: every chunk and the query are embedded with the same model and
//!    ranked by cosine similarity. There is no persistent index; each query re-embeds
//!    the corpus.
//! 3. **Remember**: each answered question is appended to the memory log with a topic
//!    label (keyword oracle, or a frequency heuristic) and an impact score.
//! 4. **Reflect**: the log is grouped by topic for gap analysis and analytics.
//!
//! # Limitations
//!
//! Stores are plain JSON files rewritten in full on every write. There is no locking:
//! run a single writer at a time.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`capability`]: Tri-state holder for external oracles loaded once per process
//! - [`documents`]: Text extraction, chunking, and the chunk store
//! - [`embedding`]: Text-to-vector embedding via ONNX Runtime
//! - [`retrieval`]: Cosine-similarity ranking over all stored chunks
//! - [`memory`]: Memory log, topics, gap analysis, analytics
//! - [`llm`]: Language-model oracle with tagged completions
//! - [`desk`]: Facade wiring the above for front ends

pub mod capability;
pub mod config;
pub mod desk;
pub mod documents;
pub mod embedding;
pub mod llm;
pub mod memory;
pub mod persist;
pub mod retrieval;
