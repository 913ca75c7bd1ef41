//! Document ingestion: text extraction, chunking, and the on-disk chunk store.

pub mod chunker;
pub mod store;
pub mod text;

use std::path::Path;

use anyhow::{Context, Result};

use self::store::{ChunkStore, TextChunk};
use self::text::DocumentReader;

/// Extract, clean, chunk and persist one document. Returns the saved chunks.
///
/// The collection is keyed by the document's file name; re-ingesting a document
/// replaces its previous chunks.
pub fn ingest(
    store: &ChunkStore,
    reader: &dyn DocumentReader,
    path: &Path,
    max_chunk_chars: usize,
) -> Result<Vec<TextChunk>> {
    let source_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("document path has no file name: {}", path.display()))?;

    let raw = reader.extract_text(path)?;
    let cleaned = text::clean_text(&raw);
    anyhow::ensure!(
        !cleaned.is_empty(),
        "no text extracted from {}",
        path.display()
    );

    let chunks = chunker::chunk_text(&cleaned, max_chunk_chars);
    tracing::info!(source = source_name, chunks = chunks.len(), "document chunked");
    store.save(source_name, &chunks)
}
