use anyhow::Result;

use quarry::config::QuarryConfig;
use quarry::desk::ResearchDesk;
use quarry::llm::OllamaClient;

/// Answer a question from the ingested documents and log it to memory.
pub async fn ask(config: &QuarryConfig, desk: &ResearchDesk, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        println!("No question entered.");
        return Ok(());
    }

    let llm = OllamaClient::new(&config.llm)?;
    let outcome = desk.ask(&llm, question).await?;

    if !outcome.context.is_empty() {
        println!("\nRetrieved {} relevant chunk(s).\n", outcome.context.len());
    }
    println!("Response:\n{}\n", outcome.answer);
    println!("Summary: {}", outcome.entry.summary);
    println!("Impact Score: {}", outcome.entry.impact_score);
    println!("Topic: {}", outcome.entry.topic);
    println!("Memory log updated.");
    Ok(())
}
