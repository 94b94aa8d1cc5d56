//! Reply generation against an LLM capability
//!
//! Owns the conversation-side bookkeeping around the raw capability call:
//! appending turns, trimming history, and token accounting. The capability
//! itself is a narrow trait so the pipeline can be exercised without a
//! network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::{Session, Turn};
use crate::{Error, Result};

/// Word-count multiplier for the fallback estimate when the capability
/// reports no usage figures
const ESTIMATE_TOKENS_PER_WORD: f64 = 1.3;

/// Token usage reported by a capability for one call
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Outcome of one chat completion call
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Generated reply text
    pub text: String,
    /// Usage counters, when the capability reports them
    pub usage: Option<TokenUsage>,
}

/// Generates a reply for an ordered message list, bounded to
/// `max_tokens` of output
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: &[Turn], max_tokens: u32) -> Result<ChatOutcome>;
}

/// OpenAI chat completions client
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the client cannot be built
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatCompletion for OpenAiChat {
    async fn complete(&self, messages: &[Turn], max_tokens: u32) -> Result<ChatOutcome> {
        tracing::debug!(messages = messages.len(), max_tokens, "requesting completion");

        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "LLM request failed");
                Error::Generation(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "LLM API error");
            return Err(Error::Generation(format!("OpenAI error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse LLM response");
            Error::Generation(format!("unparseable response: {e}"))
        })?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(ChatOutcome {
            text,
            usage: result.usage,
        })
    }
}

/// Deterministic fallback token estimate: word count scaled by a fixed
/// multiplier, so budget accounting degrades instead of failing when a
/// capability omits usage metadata.
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let estimate = (words as f64 * ESTIMATE_TOKENS_PER_WORD) as u32;
    estimate
}

/// Drives one generation step over a session's history
#[derive(Clone)]
pub struct ReplyGenerator {
    capability: Arc<dyn ChatCompletion>,
    max_reply_tokens: u32,
    max_history_messages: usize,
}

impl ReplyGenerator {
    /// Create a generator over a chat capability
    pub fn new(
        capability: Arc<dyn ChatCompletion>,
        max_reply_tokens: u32,
        max_history_messages: usize,
    ) -> Self {
        Self {
            capability,
            max_reply_tokens,
            max_history_messages,
        }
    }

    /// Append the user turn, trim the history, call the capability, and
    /// append the reply. Returns the reply text and the tokens consumed by
    /// this call.
    ///
    /// On capability failure the user turn stays appended: a failed turn
    /// still occupies an utterance slot in history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] on capability failure or empty reply
    pub async fn generate(&self, session: &mut Session, user_text: &str) -> Result<(String, u32)> {
        session.push_user(user_text);
        session.trim_history(self.max_history_messages);

        let outcome = self
            .capability
            .complete(session.history(), self.max_reply_tokens)
            .await?;

        let reply = outcome.text;
        if reply.trim().is_empty() {
            return Err(Error::Generation(
                "capability returned an empty reply".to_string(),
            ));
        }
        session.push_assistant(&reply);
        // keep the cap an invariant, not just a pre-send courtesy
        session.trim_history(self.max_history_messages);

        let tokens = match outcome.usage {
            Some(usage) if usage.total_tokens > 0 => {
                tracing::debug!(
                    prompt = usage.prompt_tokens,
                    completion = usage.completion_tokens,
                    total = usage.total_tokens,
                    "token usage reported"
                );
                usage.total_tokens
            }
            _ => {
                let estimated = estimate_tokens(user_text) + estimate_tokens(&reply);
                tracing::warn!(
                    estimated,
                    "capability reported no usage; falling back to word-count estimate"
                );
                estimated
            }
        };
        session.add_tokens(tokens);

        Ok((reply, tokens))
    }
}
