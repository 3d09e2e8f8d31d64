//! Context assembly for the downstream language model.
//!
//! Turns a ranked result list into a single bounded text block. Chunks are
//! appended in rank order until the byte budget would be exceeded; a final
//! chunk may be truncated with an ellipsis if enough budget remains to be
//! useful. Truncation never splits a UTF-8 code point.

use crate::config::ContextConfig;
use crate::loader::truncate_to_boundary;
use crate::models::ScoredChunk;

/// Returned when there is nothing to ground the answer on. Callers treat
/// this as absence of context, not as quotable content.
pub const NO_CONTEXT: &str = "No relevant information found in the knowledge base.";

const ELLIPSIS: &str = "...";

/// Concatenate ranked chunks into a context block within `config.max_bytes`.
pub fn assemble_context(results: &[ScoredChunk], config: &ContextConfig) -> String {
    if results.is_empty() {
        return NO_CONTEXT.to_string();
    }

    let mut context = String::new();

    for result in results {
        let block = format!(
            "Document: {}\nContent: {}\n\n",
            result.chunk.title, result.chunk.content
        );

        if context.len() + block.len() <= config.max_bytes {
            context.push_str(&block);
            continue;
        }

        // The block overflows. Truncate it into the remaining budget if the
        // window is big enough to carry signal; otherwise stop cleanly.
        let remaining = config.max_bytes.saturating_sub(context.len());
        if remaining > config.min_truncate_window {
            let cut = truncate_to_boundary(&block, remaining.saturating_sub(ELLIPSIS.len()));
            context.push_str(cut);
            context.push_str(ELLIPSIS);
        }
        break;
    }

    context
}
