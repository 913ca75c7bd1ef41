use anyhow::Result;
use std::sync::Arc;

use quarry::desk::ResearchDesk;

/// Show the chunks most similar to `query` without asking the language model.
pub async fn search(desk: Arc<ResearchDesk>, query: &str, top_k: usize) -> Result<()> {
    let query_text = query.to_string();
    let results =
        tokio::task::spawn_blocking(move || desk.retrieve(&query_text, top_k)).await??;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let preview: String = result.chunk.text.chars().take(120).collect();
        let ellipsis = if result.chunk.text.chars().count() > 120 { "..." } else { "" };

        println!(
            "  {}. [{}] {} (score: {:.4})",
            i + 1,
            result.chunk.source,
            result.chunk.id,
            result.score,
        );
        println!("     {preview}{ellipsis}");
        println!();
    }

    Ok(())
}
