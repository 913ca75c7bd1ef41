use anyhow::Result;

use quarry::desk::ResearchDesk;
use quarry::memory::analytics::render_reflection;

/// Print what has been learned per topic.
pub fn reflect(desk: &ResearchDesk, show_top: bool, score_threshold: i64) -> Result<()> {
    let snapshot = desk.snapshot();
    if snapshot.is_corrupt() {
        println!("Memory file contains invalid JSON");
    }

    let reflections = desk.reflect(score_threshold);
    if reflections.is_empty() {
        println!("No memory entries to reflect on.");
        return Ok(());
    }

    for reflection in &reflections {
        println!("\n{}", render_reflection(reflection, show_top));
    }
    Ok(())
}
