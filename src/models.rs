//! Core data models for the retrieval engine.
//!
//! These types represent the knowledge-base chunks and search results that
//! flow through loading, scoring, and context assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document category, assigned by filename heuristics at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Congress programme, agendas, talks.
    Events,
    /// Company profiles and commercial material.
    Company,
    /// Foundation and research entities.
    Foundation,
    /// Anything the heuristics could not place.
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Events => "events",
            Category::Company => "company",
            Category::Foundation => "foundation",
            Category::General => "general",
        }
    }
}

/// Metadata attached to each chunk at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub category: Category,
    /// Top-level JSON section the chunk was assembled from.
    pub section: String,
    pub document_type: Category,
    /// Domain-vocabulary terms found in the chunk content (max 10).
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// The unit of retrieval: one section of one source document, flattened
/// into bounded-length text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// `"<file name>_<section>_<index>"`, unique within one load cycle.
    pub id: String,
    /// Flattened text body, truncated to the configured max length.
    pub content: String,
    /// `"<document display name> - <section>"`.
    pub title: String,
    /// Provenance: collection label plus originating file.
    pub source: String,
    pub metadata: ChunkMetadata,
}

/// The full in-memory collection available for a search. Rebuilt wholesale
/// on cache expiry, read-only during its lifetime.
pub type Corpus = Vec<DocumentChunk>;

/// A chunk annotated with a query-time relevance score. Transient, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: DocumentChunk,
    /// Normalized relevance in `[0, 1]`.
    pub similarity: f64,
    /// Distinct query tokens that produced any match.
    pub matched_words: usize,
}
