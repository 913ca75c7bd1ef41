use anyhow::Result;

use quarry::desk::ResearchDesk;
use quarry::memory::gaps::{render_markdown, GapMode};

/// Print knowledge gaps for `mode` as Markdown.
pub fn gaps(desk: &ResearchDesk, mode: GapMode) -> Result<()> {
    let snapshot = desk.snapshot();
    if snapshot.is_corrupt() {
        println!("Memory file contains invalid JSON; treating it as empty.");
        return Ok(());
    }
    if snapshot.entries.is_empty() {
        println!("No memory entries found.");
        return Ok(());
    }

    let gaps = desk.analyze_gaps_in(&snapshot.entries, mode);
    if gaps.is_empty() {
        println!("No gaps found for mode {mode}");
        return Ok(());
    }

    println!("{}", render_markdown(&gaps, desk.gap_policy()));
    Ok(())
}
