//! # Congress Knowledge Base
//!
//! Retrieval engine and chat backend for a palm-oil congress knowledge base.
//!
//! The engine loads structured JSON documents into scored chunks, ranks them
//! for a query (remote vector search when configured, lexical keyword scoring
//! otherwise), and assembles the top results into a bounded context block for
//! a chat completion model.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌───────────┐
//! │ JSON docs  │──▶│   Loader   │──▶│ TTL cache │
//! └────────────┘   └────────────┘   └─────┬─────┘
//!                                         │
//!                   ┌─────────────────────┤
//!                   ▼                     ▼
//!             ┌───────────┐        ┌───────────┐
//!             │  Vector   │──fail──▶│  Lexical │
//!             │  search   │        │  scoring  │
//!             └─────┬─────┘        └─────┬─────┘
//!                   └─────────┬─────────┘
//!                             ▼
//!                      ┌────────────┐
//!                      │  Context   │──▶ chat completion
//!                      └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ckb load                          # inspect the loaded corpus
//! ckb search "agenda del congreso"  # rank chunks for a query
//! ckb ask "¿Cuándo es la plenaria?" # retrieve + answer
//! ckb serve                         # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`loader`] | JSON corpus loading and chunking |
//! | [`cache`] | TTL corpus cache |
//! | [`tokenize`] | Query tokenization and domain vocabulary |
//! | [`scoring`] | Lexical relevance scoring |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`vector`] | Remote vector similarity search |
//! | [`retrieve`] | Vector-first retrieval with lexical fallback |
//! | [`context`] | Context block assembly |
//! | [`completion`] | Chat completion client |
//! | [`server`] | HTTP API server |

pub mod cache;
pub mod completion;
pub mod config;
pub mod context;
pub mod embedding;
pub mod loader;
pub mod models;
pub mod retrieve;
pub mod scoring;
pub mod server;
pub mod tokenize;
pub mod vector;
