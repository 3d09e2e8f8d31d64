//! Retrieval pipeline: vector search first, lexical search as fallback.
//!
//! The vector path depends on two remote collaborators (embedding API and
//! similarity index) and must never hang a request: the whole path runs
//! under one `tokio::time::timeout`. Any failure, timeout, or empty result
//! set falls through to the lexical scorer over the cached corpus, so a
//! query always gets an answer path without propagating vector errors to
//! the caller.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::CorpusCache;
use crate::config::Config;
use crate::context;
use crate::embedding::Embedder;
use crate::models::ScoredChunk;
use crate::scoring;
use crate::vector::SimilaritySearch;

/// Why the vector path produced nothing. Informational only: every variant
/// falls back to lexical search rather than reaching the caller.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("vector search is not configured")]
    VectorDisabled,
    #[error("embedding request failed: {0}")]
    Embedding(#[source] anyhow::Error),
    #[error("similarity search failed: {0}")]
    Index(#[source] anyhow::Error),
    #[error("vector search timed out after {0:?}")]
    Timeout(Duration),
    #[error("no results above threshold")]
    NoResults,
}

/// Owns the two retrieval strategies and their precedence.
pub struct Retriever {
    cache: Arc<CorpusCache>,
    embedder: Option<Box<dyn Embedder>>,
    index: Option<Box<dyn SimilaritySearch>>,
    config: Config,
}

impl Retriever {
    pub fn new(
        config: Config,
        cache: Arc<CorpusCache>,
        embedder: Option<Box<dyn Embedder>>,
        index: Option<Box<dyn SimilaritySearch>>,
    ) -> Self {
        Self {
            cache,
            embedder,
            index,
            config,
        }
    }

    /// Ranked chunks for a query: vector path when possible, lexical
    /// otherwise. Never fails; an unmatched query returns an empty list.
    /// The caller's `limit` and `threshold` bound the result on both paths.
    pub async fn retrieve(&self, query: &str, limit: usize, threshold: f64) -> Vec<ScoredChunk> {
        match self.vector_search(query).await {
            Ok(mut hits) => {
                // The index is queried with the config-wide vector settings;
                // the caller's bounds apply to what goes back out.
                hits.retain(|h| h.similarity >= threshold);
                hits.truncate(limit);
                if hits.is_empty() {
                    return self.lexical_search(query, limit, threshold);
                }
                debug!(results = hits.len(), "vector search succeeded");
                hits
            }
            Err(e) => {
                match e {
                    SearchError::VectorDisabled => {}
                    ref other => warn!(error = %other, "falling back to lexical search"),
                }
                self.lexical_search(query, limit, threshold)
            }
        }
    }

    /// Retrieve and assemble the context block in one step.
    pub async fn find_relevant_context(&self, query: &str) -> String {
        let results = self
            .retrieve(
                query,
                self.config.retrieval.limit,
                self.config.retrieval.threshold,
            )
            .await;
        context::assemble_context(&results, &self.config.context)
    }

    /// Lexical scoring over the cached corpus.
    pub fn lexical_search(&self, query: &str, limit: usize, threshold: f64) -> Vec<ScoredChunk> {
        let corpus = self.cache.get();
        scoring::search(&corpus, query, limit, threshold, &self.config.scoring)
    }

    /// The full vector path (embed, then remote similarity search) under a
    /// single wall-clock bound.
    pub async fn vector_search(&self, query: &str) -> Result<Vec<ScoredChunk>, SearchError> {
        let (Some(embedder), Some(index)) = (self.embedder.as_ref(), self.index.as_ref()) else {
            return Err(SearchError::VectorDisabled);
        };

        let budget = Duration::from_secs(self.config.retrieval.vector_timeout_secs);
        let retrieval = &self.config.retrieval;

        let path = async {
            let embedding = embedder
                .embed(query)
                .await
                .map_err(SearchError::Embedding)?;
            index
                .similarity_search(&embedding, retrieval.vector_threshold, retrieval.vector_limit)
                .await
                .map_err(SearchError::Index)
        };

        let hits = tokio::time::timeout(budget, path)
            .await
            .map_err(|_| SearchError::Timeout(budget))??;

        if hits.is_empty() {
            return Err(SearchError::NoResults);
        }
        Ok(hits)
    }
}
