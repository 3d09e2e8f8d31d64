//! Query embedding collaborator.
//!
//! The retrieval engine treats "text in, vector out" as an external
//! capability. [`Embedder`] is the seam; [`OpenAiEmbedder`] is the shipped
//! implementation, calling the OpenAI embeddings API with exponential
//! backoff for rate limits and server errors.
//!
//! Retry strategy:
//! - HTTP 429 and 5xx: retry with backoff (1s, 2s, 4s, ... capped at 32s)
//! - other 4xx: fail immediately
//! - network errors: retry

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::config::EmbeddingConfig;

/// External embedding capability: fixed-dimension vector per text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single query string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for status endpoints and logs.
    fn model_name(&self) -> &str;

    /// Vector dimensionality; query and stored vectors must agree.
    fn dims(&self) -> usize;
}

/// OpenAI `POST /v1/embeddings` client.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    /// Build from configuration. Requires `OPENAI_API_KEY` in the
    /// environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "encoding_format": "float",
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/embeddings")
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_embedding_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, "embedding request retried");
                        last_err = Some(anyhow::anyhow!(
                            "embeddings API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("embeddings API error {}: {}", status, body_text);
                }
                Err(e) => {
                    warn!(error = %e, attempt, "embedding request failed, retrying");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("embedding failed after retries")))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.request(text).await?;
        if vector.len() != self.dims {
            bail!(
                "embedding dimensionality mismatch: expected {}, got {}",
                self.dims,
                vector.len()
            );
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Extract the first `data[].embedding` array from the API response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("invalid embeddings response: missing data[0].embedding"))?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Instantiate the configured embedder, or `None` when disabled.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Option<Box<dyn Embedder>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => Ok(Some(Box::new(OpenAiEmbedder::new(config)?))),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
