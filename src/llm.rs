//! Language-model oracle.
//!
//! [`LanguageModel::complete`] never fails past its boundary: transport errors,
//! timeouts and bad responses come back as [`Completion::Failed`], which callers must
//! handle explicitly instead of mistaking an error message for an answer.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::memory::types::DEFAULT_IMPACT_SCORE;

static SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([1-9]|10)\b").expect("valid score pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Answer(String),
    Failed { reason: String },
}

impl Completion {
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Answer(text) => Some(text),
            Self::Failed { .. } => None,
        }
    }
}

pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`, optionally framed with retrieved `context`.
    fn complete(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> impl Future<Output = Completion> + Send;
}

/// Prompt with the context wrapped in a system block.
pub fn frame_prompt(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => format!("<<SYS>>\n{ctx}\n<</SYS>>\n{prompt}"),
        _ => prompt.to_string(),
    }
}

/// First whole number between 1 and 10 in a rating reply, or the default score.
pub fn parse_impact_score(reply: &str) -> i64 {
    SCORE
        .captures(reply)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_IMPACT_SCORE)
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama `/api/generate` client with a fixed request timeout.
pub struct OllamaClient {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        })
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        anyhow::ensure!(
            response.status().is_success(),
            "{url} returned HTTP {}",
            response.status()
        );
        let body: GenerateResponse = response.json().await?;
        Ok(body.response.trim().to_string())
    }
}

impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str, context: Option<&str>) -> Completion {
        let full_prompt = frame_prompt(prompt, context);
        match self.generate(&full_prompt).await {
            Ok(text) => Completion::Answer(text),
            Err(e) => {
                tracing::warn!(model = %self.model, error = %format!("{e:#}"), "language model call failed");
                Completion::Failed {
                    reason: format!("{e:#}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_wrapped_in_system_block() {
        assert_eq!(
            frame_prompt("Q?", Some("ctx")),
            "<<SYS>>\nctx\n<</SYS>>\nQ?"
        );
        assert_eq!(frame_prompt("Q?", Some("")), "Q?");
        assert_eq!(frame_prompt("Q?", None), "Q?");
    }

    #[test]
    fn impact_score_parsing() {
        assert_eq!(parse_impact_score("I would rate this 8 out of 10."), 8);
        assert_eq!(parse_impact_score("10"), 10);
        assert_eq!(parse_impact_score("Score: 10/10"), 10);
        assert_eq!(parse_impact_score("It's a 42"), DEFAULT_IMPACT_SCORE);
        assert_eq!(parse_impact_score("no idea"), DEFAULT_IMPACT_SCORE);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_failed_completion() {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9".into(),
            model: "none".into(),
            timeout_secs: 2,
        };
        let client = OllamaClient::new(&config).unwrap();
        let completion = client.complete("hello", None).await;
        assert!(matches!(completion, Completion::Failed { .. }));
    }
}
