//! JSON file persistence helpers shared by the chunk store and memory log.
//!
//! Writes go to a sibling `.tmp` file that is renamed over the target, so a reader
//! never observes a half-written file. There is no cross-process locking: two writers
//! doing read-modify-write on the same file race, and the later rename wins.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)
        .with_context(|| format!("failed to write temp file: {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename temp file to {}", path.display()))?;
    Ok(())
}
