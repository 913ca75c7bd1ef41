//! CLI `ingest` command: extract, chunk and store a document.

use anyhow::Result;
use std::path::Path;

use quarry::config::QuarryConfig;
use quarry::desk::ResearchDesk;
use quarry::documents::text::reader_for;

pub fn ingest(config: &QuarryConfig, desk: &ResearchDesk, path: &Path) -> Result<()> {
    let reader = reader_for(path, &config.storage.pdftotext_bin)?;
    let chunks = desk.ingest(reader.as_ref(), path)?;

    let source = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    println!(
        "Stored {} chunk(s) from {} in {}",
        chunks.len(),
        path.display(),
        desk.chunk_store().file_for(source).display()
    );
    Ok(())
}
