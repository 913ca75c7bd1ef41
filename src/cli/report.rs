//! CLI `report` command: write the analytics report to disk.

use anyhow::{Context, Result};

use quarry::config::QuarryConfig;
use quarry::desk::ResearchDesk;
use quarry::memory::analytics::render_report;

pub fn report(config: &QuarryConfig, desk: &ResearchDesk, top_n: Option<usize>) -> Result<()> {
    let summary = desk.summarize_top(top_n.unwrap_or(config.analytics.top_n));
    if summary.is_empty() {
        println!("No memory entries found.");
        return Ok(());
    }

    let path = config.resolved_report_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(&path, render_report(&summary))
        .with_context(|| format!("failed to write report to {}", path.display()))?;

    println!("Report saved to {}", path.display());
    Ok(())
}
