use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuarryConfig {
    pub general: GeneralConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub topics: TopicsConfig,
    pub gaps: GapsConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Memory log path, relative to `data_dir` unless absolute.
    pub memory_file: String,
    /// Chunk directory, relative to `data_dir` unless absolute.
    pub chunk_dir: String,
    /// Analytics report path, relative to `data_dir` unless absolute.
    pub report_file: String,
    /// Executable used to turn PDFs into text.
    pub pdftotext_bin: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub max_chunk_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TopicsConfig {
    /// Use the embedding-backed keyword extractor before the frequency heuristic.
    pub keyword_oracle: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GapsConfig {
    pub stale_after_days: i64,
    pub high_impact_threshold: i64,
    pub sparse_entry_count: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub top_n: usize,
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
            topics: TopicsConfig::default(),
            gaps: GapsConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_quarry_dir().to_string_lossy().into_owned(),
            memory_file: "memory/memory.json".into(),
            chunk_dir: "text_chunks".into(),
            report_file: "analytics_report.md".into(),
            pdftotext_bin: "pdftotext".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_quarry_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_chunk_chars: 500,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            timeout_secs: 60,
        }
    }
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            keyword_oracle: true,
        }
    }
}

impl Default for GapsConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 10,
            high_impact_threshold: 7,
            sparse_entry_count: 3,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

/// Returns `~/.quarry/`, or `./.quarry/` when no home directory can be resolved.
pub fn default_quarry_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quarry")
}

/// Returns the default config file path: `~/.quarry/config.toml`
pub fn default_config_path() -> PathBuf {
    default_quarry_dir().join("config.toml")
}

impl QuarryConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            QuarryConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (QUARRY_DATA_DIR, QUARRY_LOG_LEVEL, QUARRY_LLM_MODEL, QUARRY_LLM_ENDPOINT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("QUARRY_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("QUARRY_LOG_LEVEL") {
            self.general.log_level = val;
        }
        if let Ok(val) = std::env::var("QUARRY_LLM_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("QUARRY_LLM_ENDPOINT") {
            self.llm.endpoint = val;
        }
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    pub fn resolved_memory_path(&self) -> PathBuf {
        self.under_data_dir(&self.storage.memory_file)
    }

    pub fn resolved_chunk_dir(&self) -> PathBuf {
        self.under_data_dir(&self.storage.chunk_dir)
    }

    pub fn resolved_report_path(&self) -> PathBuf {
        self.under_data_dir(&self.storage.report_file)
    }

    fn under_data_dir(&self, path: &str) -> PathBuf {
        let expanded = expand_tilde(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.resolved_data_dir().join(expanded)
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
