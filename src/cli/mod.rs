pub mod ask;
pub mod gaps;
pub mod ingest;
pub mod rechunk;
pub mod reflect;
pub mod report;
pub mod search;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use quarry::config::EmbeddingConfig;
use quarry::embedding::local::model_paths;

const MODEL_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx";
const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let (model_path, tokenizer_path) = model_paths(config);
    if let Some(cache_dir) = model_path.parent() {
        std::fs::create_dir_all(cache_dir)
            .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;
    }

    for (label, url, path) in [
        ("model.onnx (~90MB)", MODEL_URL, &model_path),
        ("tokenizer.json", TOKENIZER_URL, &tokenizer_path),
    ] {
        if path.exists() {
            println!("Already present: {}", path.display());
            continue;
        }
        println!("Downloading {label}...");
        download_file(url, path).await?;
        println!("Saved to {}", path.display());
    }

    println!("Model download complete. Retrieval and keyword topics are ready.");
    Ok(())
}

/// Stream a file to disk with a progress bar. Uses atomic write (tmp + rename).
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                    .context("invalid progress template")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(bytes) = response.chunk().await.context("error reading response")? {
        file.write_all(&bytes)
            .await
            .context("error writing to file")?;
        pb.inc(bytes.len() as u64);
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
