//! Vector similarity search collaborator.
//!
//! Embedding storage and indexing live outside this crate: the engine only
//! needs a black-box `similaritySearch(embedding, threshold, limit)` call.
//! [`SimilaritySearch`] is that seam; [`RemoteVectorIndex`] implements it
//! over an HTTP RPC endpoint. Cosine similarity is provided for callers
//! that rank vectors locally.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{DocumentChunk, ScoredChunk};

/// Black-box similarity search over pre-computed document embeddings.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn similarity_search(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;
}

/// Remote similarity-search endpoint speaking a small JSON RPC:
/// `{ query_embedding, similarity_threshold, match_count }` in, an array of
/// chunks with a `similarity` field out.
pub struct RemoteVectorIndex {
    client: reqwest::Client,
    url: String,
}

impl RemoteVectorIndex {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, url })
    }
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(flatten)]
    chunk: DocumentChunk,
    #[serde(default)]
    similarity: f64,
}

#[async_trait]
impl SimilaritySearch for RemoteVectorIndex {
    async fn similarity_search(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let body = serde_json::json!({
            "query_embedding": embedding,
            "similarity_threshold": threshold,
            "match_count": limit,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("similarity-search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            anyhow::bail!("similarity-search error {}: {}", status, body_text);
        }

        let results: Vec<WireResult> = response
            .json()
            .await
            .context("invalid similarity-search response")?;

        Ok(results
            .into_iter()
            .map(|r| ScoredChunk {
                chunk: r.chunk,
                similarity: r.similarity,
                matched_words: 0,
            })
            .collect())
    }
}

/// Cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty, mismatched-length, or zero-magnitude vectors
/// rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_magnitude_guarded() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 2.0];
        let sim = cosine_similarity(&a, &b);
        assert_eq!(sim, 0.0);
        assert!(!sim.is_nan());
    }

    #[test]
    fn mismatched_lengths_guarded() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn wire_result_deserializes_with_similarity() {
        let json = serde_json::json!({
            "id": "agenda.json_agenda_0",
            "content": "Programa del día",
            "title": "Congreso - agenda",
            "source": "FEDEPALMA - agenda.json",
            "metadata": {
                "category": "events",
                "section": "agenda",
                "document_type": "events",
                "keywords": ["congreso"]
            },
            "similarity": 0.83
        });
        let result: WireResult = serde_json::from_value(json).unwrap();
        assert!((result.similarity - 0.83).abs() < 1e-9);
        assert_eq!(result.chunk.metadata.section, "agenda");
    }
}
