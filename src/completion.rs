//! Chat-completion collaborator.
//!
//! The engine's output is a ranked context block; this module forwards it,
//! together with the user message and a short conversation history, to the
//! OpenAI chat-completions API and returns the model's plain-text reply.
//! The reply is opaque to the engine beyond being text.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::config::CompletionConfig;
use crate::context::NO_CONTEXT;

/// Base instruction set for the congress assistant.
const SYSTEM_PROMPT: &str = "You are the official assistant of the Guaicaramo business group \
for the FEDEPALMA national palm-growers congress.

Your job is to answer questions about the congress programme, conference \
schedules, speakers, the group's companies, and regenerative agriculture.

Instructions:
- Answer ONLY from the provided document context.
- If the context does not contain the answer, say plainly that you do not \
have that specific information.
- For agenda questions, list every event found in the context with its \
exact times and speakers, separating plenary sessions from commercial talks.
- Be concise but complete, with a professional and friendly tone.
- Only answer questions related to palm growing and the agro-industrial \
sector; refer anything else to the appropriate contacts.";

/// One prior turn of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

/// The model's reply plus request accounting.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// OpenAI `POST /v1/chat/completions` client.
pub struct CompletionClient {
    client: reqwest::Client,
    api_key: String,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Build from configuration. Requires `OPENAI_API_KEY` in the
    /// environment.
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Synthesize an answer grounded in the retrieved context.
    pub async fn complete(
        &self,
        message: &str,
        context: &str,
        history: &[ChatTurn],
    ) -> Result<ChatReply> {
        let messages = build_messages(message, context, history, self.config.history_turns);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("chat-completions API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("chat-completions response carried no content"))?;

        Ok(ChatReply {
            response: text.trim().to_string(),
            conversation_id: format!("conv_{}", Uuid::new_v4()),
            model: self.config.model.clone(),
            prompt_tokens: json
                .pointer("/usage/prompt_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            completion_tokens: json
                .pointer("/usage/completion_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
        })
    }
}

/// Assemble the chat message list: system prompt, context (when present),
/// the most recent history turns, then the user message.
fn build_messages(
    message: &str,
    context: &str,
    history: &[ChatTurn],
    history_turns: usize,
) -> Vec<serde_json::Value> {
    let mut messages = vec![serde_json::json!({
        "role": "system",
        "content": SYSTEM_PROMPT,
    })];

    // The sentinel means "no grounding found"; it is never forwarded as if
    // it were document content.
    if !context.trim().is_empty() && context != NO_CONTEXT {
        messages.push(serde_json::json!({
            "role": "system",
            "content": format!(
                "OFFICIAL CONGRESS INFORMATION:\n\n{}\n\nBase your answer entirely on the \
                 information above.",
                context
            ),
        }));
    }

    let recent = history.len().saturating_sub(history_turns);
    for turn in &history[recent..] {
        messages.push(serde_json::json!({
            "role": turn.role,
            "content": turn.content,
        }));
    }

    messages.push(serde_json::json!({
        "role": "user",
        "content": message.trim(),
    }));

    messages
}
