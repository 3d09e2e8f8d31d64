//! HTTP API for the congress knowledge base.
//!
//! Exposes the retrieval engine and chat assistant over a small JSON API
//! suitable for a web frontend.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Answer a user message grounded in retrieved context |
//! | `POST` | `/api/search` | Rank document chunks for a query |
//! | `GET`  | `/api/status` | Corpus and model status |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `completion_disabled` (400),
//! `timeout` (408), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the congress web
//! frontend can call the API cross-origin.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::cache::CorpusCache;
use crate::completion::{ChatTurn, CompletionClient};
use crate::config::Config;
use crate::context::{self, NO_CONTEXT};
use crate::models::ScoredChunk;
use crate::retrieve::Retriever;

/// Maximum accepted length of a chat message, in characters.
const MAX_MESSAGE_CHARS: usize = 2000;

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    cache: Arc<CorpusCache>,
    retriever: Arc<Retriever>,
    /// `None` when `OPENAI_API_KEY` is absent; `/api/chat` then returns
    /// `completion_disabled` instead of failing at startup.
    completion: Option<Arc<CompletionClient>>,
}

/// Starts the HTTP server on the address configured in `[server].bind`.
///
/// Runs indefinitely until the process is terminated.
pub async fn run_server(
    config: &Config,
    cache: Arc<CorpusCache>,
    retriever: Arc<Retriever>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let completion = match CompletionClient::new(config.completion.clone()) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            info!(reason = %e, "chat completion disabled");
            None
        }
    };

    let state = AppState {
        config: Arc::new(config.clone()),
        cache,
        retriever,
        completion,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/search", post(handle_search))
        .route("/api/status", get(handle_status))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("API server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 408 Request Timeout error.
fn timeout_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::REQUEST_TIMEOUT,
        code: "timeout".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 Internal Server Error.
fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps a completion failure onto the error contract: an HTTP client
/// timeout anywhere in the error chain becomes a 408, everything else a
/// 500.
fn classify_completion_error(err: anyhow::Error) -> AppError {
    let timed_out = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(reqwest::Error::is_timeout);
    if timed_out {
        timeout_error(err.to_string())
    } else {
        internal_error(err.to_string())
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/status ============

/// JSON response body for `GET /api/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: String,
    version: String,
    corpus_chunks: usize,
    categories: BTreeMap<String, usize>,
    embedding_model: Option<String>,
    completion_model: Option<String>,
}

/// Handler for `GET /api/status`.
///
/// Reports corpus size, the category breakdown, and which models are
/// configured. Reading the corpus goes through the cache, so this endpoint
/// also serves as a cheap warm-up call.
async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let corpus = state.cache.get();

    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    for chunk in corpus.iter() {
        *categories
            .entry(chunk.metadata.category.as_str().to_string())
            .or_insert(0) += 1;
    }

    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        corpus_chunks: corpus.len(),
        categories,
        embedding_model: state
            .config
            .embedding
            .is_enabled()
            .then(|| state.config.embedding.model.clone()),
        completion_model: state
            .completion
            .is_some()
            .then(|| state.config.completion.model.clone()),
    })
}

// ============ POST /api/search ============

/// JSON request body for `POST /api/search`.
#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    limit: Option<usize>,
    threshold: Option<f64>,
    /// `"auto"` (vector with lexical fallback, the default) or `"keyword"`.
    mode: Option<String>,
}

/// JSON response body for `POST /api/search`.
#[derive(Serialize)]
struct SearchResponse {
    query: String,
    count: usize,
    results: Vec<ScoredChunk>,
    processing_time_ms: u128,
}

/// Handler for `POST /api/search`.
async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let started = Instant::now();
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let retrieval = &state.config.retrieval;
    let limit = req
        .limit
        .unwrap_or(retrieval.limit)
        .clamp(1, retrieval.max_limit);
    let threshold = req.threshold.unwrap_or(retrieval.threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(bad_request("threshold must be between 0 and 1"));
    }

    let mode = req.mode.as_deref().unwrap_or("auto");
    let results = match mode {
        "keyword" => state.retriever.lexical_search(&query, limit, threshold),
        "auto" => state.retriever.retrieve(&query, limit, threshold).await,
        other => {
            return Err(bad_request(format!(
                "unknown search mode: {} (expected auto or keyword)",
                other
            )))
        }
    };

    Ok(Json(SearchResponse {
        query,
        count: results.len(),
        results,
        processing_time_ms: started.elapsed().as_millis(),
    }))
}

// ============ POST /api/chat ============

/// JSON request body for `POST /api/chat`.
#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
}

/// JSON response body for `POST /api/chat`.
#[derive(Serialize)]
struct ChatResponse {
    response: String,
    conversation_id: String,
    model: String,
    context_found: bool,
    /// Titles of the chunks the answer was grounded on.
    sources: Vec<String>,
    prompt_tokens: u64,
    completion_tokens: u64,
    processing_time_ms: u128,
}

/// Handler for `POST /api/chat`.
///
/// Retrieves grounding context for the message, then asks the completion
/// model to answer from it. The sentinel "no context" string counts as no
/// grounding but the model is still asked, so out-of-corpus questions get a
/// polite refusal rather than an HTTP error.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let started = Instant::now();
    let message = req.message.trim();
    if message.is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(bad_request(format!(
            "message exceeds {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let Some(completion) = state.completion.as_ref() else {
        return Err(AppError {
            status: StatusCode::BAD_REQUEST,
            code: "completion_disabled".to_string(),
            message: "chat completion is not configured (OPENAI_API_KEY missing)".to_string(),
        });
    };

    let retrieval = &state.config.retrieval;
    let results = state
        .retriever
        .retrieve(message, retrieval.limit, retrieval.threshold)
        .await;
    let context = context::assemble_context(&results, &state.config.context);
    let context_found = context != NO_CONTEXT;
    let sources: Vec<String> = results.iter().map(|r| r.chunk.title.clone()).collect();

    let reply = completion
        .complete(message, &context, &req.history)
        .await
        .map_err(classify_completion_error)?;

    Ok(Json(ChatResponse {
        response: reply.response,
        conversation_id: reply.conversation_id,
        model: reply.model,
        context_found,
        sources,
        prompt_tokens: reply.prompt_tokens,
        completion_tokens: reply.completion_tokens,
        processing_time_ms: started.elapsed().as_millis(),
    }))
}
