use anyhow::Result;

use quarry::desk::ResearchDesk;

/// Make past interactions retrievable by turning the memory log into chunks.
pub fn rechunk(desk: &ResearchDesk) -> Result<()> {
    let snapshot = desk.snapshot();
    if snapshot.entries.is_empty() {
        println!("No memory log entries to convert.");
        return Ok(());
    }

    let chunks = desk.rechunk_memory()?;
    println!(
        "Saved {} memory chunk(s) to {}",
        chunks.len(),
        desk.chunk_store().dir().display()
    );
    Ok(())
}
