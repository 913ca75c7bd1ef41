//! Document-to-text extraction and cleanup.
//!
//! Extraction is delegated: plain text files are read directly, PDFs go through an
//! external `pdftotext` executable. Everything downstream only sees cleaned text.

use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Collapse every whitespace run to a single space and trim the ends.
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Source of raw text for a document on disk.
pub trait DocumentReader {
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Reads UTF-8 text files (`.txt`, `.md`) as-is.
pub struct PlainTextReader;

impl DocumentReader for PlainTextReader {
    fn extract_text(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

/// Extracts PDF text by running `pdftotext <file> -`.
pub struct PdfToTextReader {
    pub program: String,
}

impl DocumentReader for PdfToTextReader {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .arg(path)
            .arg("-")
            .output()
            .with_context(|| {
                format!(
                    "failed to run `{}` (install poppler-utils or set storage.pdftotext_bin)",
                    self.program
                )
            })?;

        anyhow::ensure!(
            output.status.success(),
            "`{}` exited with {}: {}",
            self.program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Pick a reader by file extension.
pub fn reader_for(path: &Path, pdftotext_bin: &str) -> Result<Box<dyn DocumentReader>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => Ok(Box::new(PdfToTextReader {
            program: pdftotext_bin.to_string(),
        })),
        "txt" | "md" | "markdown" | "text" => Ok(Box::new(PlainTextReader)),
        other => anyhow::bail!(
            "unsupported document type '{other}' for {}. Supported: pdf, txt, md",
            path.display()
        ),
    }
}
