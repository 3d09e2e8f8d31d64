//! # Congress Knowledge Base CLI (`ckb`)
//!
//! The `ckb` binary is the primary interface for the congress knowledge base.
//! It provides commands for inspecting the loaded corpus, searching it,
//! asking grounded questions, and starting the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! ckb --config ./config/ckb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ckb load` | Load the JSON corpus and print a summary |
//! | `ckb search "<query>"` | Rank document chunks for a query |
//! | `ckb ask "<message>"` | Retrieve context and answer with the chat model |
//! | `ckb serve` | Start the HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Inspect what the loader produced
//! ckb load --config ./config/ckb.toml
//!
//! # Keyword search only
//! ckb search "agenda del congreso" --mode keyword --config ./config/ckb.toml
//!
//! # Vector search with lexical fallback (the default)
//! ckb search "aceite alto oleico" --limit 5 --config ./config/ckb.toml
//!
//! # Ask a grounded question (requires OPENAI_API_KEY)
//! ckb ask "¿A qué hora es la plenaria?" --config ./config/ckb.toml
//!
//! # Start the API server
//! ckb serve --config ./config/ckb.toml
//! ```

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use congress_kb::cache::CorpusCache;
use congress_kb::completion::CompletionClient;
use congress_kb::config::{self, Config};
use congress_kb::embedding::create_embedder;
use congress_kb::retrieve::Retriever;
use congress_kb::vector::RemoteVectorIndex;
use congress_kb::{loader, server};

/// Congress Knowledge Base CLI — retrieval engine and chat backend for a
/// palm-oil congress knowledge base.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ckb.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ckb",
    about = "Congress Knowledge Base — document retrieval and chat backend",
    version,
    long_about = "Congress Knowledge Base loads structured JSON documents into scored chunks, \
    ranks them for a query (remote vector search when configured, lexical keyword scoring \
    otherwise), and assembles the top results into a bounded context block for a chat \
    completion model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ckb.toml`. Corpus, scoring, retrieval, and
    /// server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/ckb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Load the JSON corpus and print a summary.
    ///
    /// Runs the loader over the configured data directory and prints chunk
    /// counts per category. Useful for verifying documents before serving.
    Load,

    /// Rank document chunks for a query.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `auto` (vector with lexical fallback) or `keyword`.
        #[arg(long, default_value = "auto")]
        mode: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum normalized score, between 0 and 1.
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Retrieve context for a message and answer with the chat model.
    ///
    /// Requires `OPENAI_API_KEY` in the environment.
    Ask {
        /// The user message.
        message: String,
    },

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// chat, search, and status endpoints.
    Serve,
}

/// Build the shared cache and retriever from configuration.
///
/// The vector path is wired up only when both an embedding provider and a
/// similarity index URL are configured; otherwise retrieval is lexical only.
fn build_retriever(cfg: &Config) -> anyhow::Result<(Arc<CorpusCache>, Arc<Retriever>)> {
    let cache = Arc::new(CorpusCache::new(cfg.corpus.clone()));

    let embedder = create_embedder(&cfg.embedding)?;
    let index = match (&embedder, &cfg.embedding.index_url) {
        (Some(_), Some(url)) => Some(Box::new(RemoteVectorIndex::new(
            url.clone(),
            cfg.embedding.timeout_secs,
        )?) as Box<dyn congress_kb::vector::SimilaritySearch>),
        _ => None,
    };

    let retriever = Arc::new(Retriever::new(
        cfg.clone(),
        cache.clone(),
        embedder,
        index,
    ));
    Ok((cache, retriever))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Load => {
            run_load(&cfg)?;
        }
        Commands::Search {
            query,
            mode,
            limit,
            threshold,
        } => {
            run_search(&cfg, &query, &mode, limit, threshold).await?;
        }
        Commands::Ask { message } => {
            run_ask(&cfg, &message).await?;
        }
        Commands::Serve => {
            let (cache, retriever) = build_retriever(&cfg)?;
            server::run_server(&cfg, cache, retriever).await?;
        }
    }

    Ok(())
}

/// `ckb load`: load the corpus once and print a per-category summary.
fn run_load(cfg: &Config) -> anyhow::Result<()> {
    let corpus = loader::load_corpus(&cfg.corpus);

    if corpus.is_empty() {
        println!(
            "No chunks loaded from {} (directory missing or no usable JSON documents).",
            cfg.corpus.data_dir.display()
        );
        return Ok(());
    }

    let mut categories: std::collections::BTreeMap<&str, usize> = Default::default();
    for chunk in &corpus {
        *categories.entry(chunk.metadata.category.as_str()).or_insert(0) += 1;
    }

    println!(
        "Loaded {} chunks from {}:",
        corpus.len(),
        cfg.corpus.data_dir.display()
    );
    for (category, count) in &categories {
        println!("  {:<12} {}", category, count);
    }
    for chunk in &corpus {
        println!("  - {} [{}]", chunk.id, chunk.title);
    }

    Ok(())
}

/// `ckb search`: rank chunks and print them.
async fn run_search(
    cfg: &Config,
    query: &str,
    mode: &str,
    limit: Option<usize>,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    let limit = limit
        .unwrap_or(cfg.retrieval.limit)
        .clamp(1, cfg.retrieval.max_limit);
    let threshold = threshold.unwrap_or(cfg.retrieval.threshold);
    if !(0.0..=1.0).contains(&threshold) {
        bail!("threshold must be between 0 and 1");
    }

    let (_cache, retriever) = build_retriever(cfg)?;

    let results = match mode {
        "keyword" => retriever.lexical_search(query, limit, threshold),
        "auto" => retriever.retrieve(query, limit, threshold).await,
        other => bail!("unknown search mode: {} (expected auto or keyword)", other),
    };

    if results.is_empty() {
        println!("No results for \"{}\".", query);
        return Ok(());
    }

    println!("{} result(s) for \"{}\":", results.len(), query);
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} ({})",
            rank + 1,
            result.similarity,
            result.chunk.title,
            result.chunk.source
        );
        let preview: String = result.chunk.content.chars().take(160).collect();
        println!("   {}", preview);
    }

    Ok(())
}

/// `ckb ask`: retrieve context and answer with the completion model.
async fn run_ask(cfg: &Config, message: &str) -> anyhow::Result<()> {
    let message = message.trim();
    if message.is_empty() {
        bail!("message must not be empty");
    }

    let (_cache, retriever) = build_retriever(cfg)?;
    let completion = CompletionClient::new(cfg.completion.clone())?;

    let context = retriever.find_relevant_context(message).await;
    let reply = completion.complete(message, &context, &[]).await?;

    println!("{}", reply.response);
    println!();
    println!(
        "[{} | {} prompt + {} completion tokens]",
        reply.model, reply.prompt_tokens, reply.completion_tokens
    );

    Ok(())
}
