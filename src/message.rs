//! Normalized message and request/response types shared by all providers

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,
    /// Assistant message
    Assistant,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub input_tokens: u32,

    /// Number of tokens in the completion
    pub output_tokens: u32,
}

/// A normalized chat request as accepted by the gateway.
///
/// `provider` is optional; when absent the configured default provider is
/// used. `max_tokens` and `temperature` carry the same defaults for every
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Provider id to route to; `None` means "use the default provider"
    #[serde(default)]
    pub provider: Option<String>,

    /// Ordered conversation messages
    pub messages: Vec<Message>,

    /// Optional system prompt, shaped per provider by each adapter
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Maximum tokens in the response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

pub(crate) fn default_max_tokens() -> u32 {
    4096
}

pub(crate) fn default_temperature() -> f32 {
    0.7
}

/// A normalized chat result, independent of the upstream wire format.
///
/// `content` may be a bracketed placeholder such as `"[Empty response:
/// SAFETY]"` when the upstream returned a 200 with no usable text; that is a
/// valid success value, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    /// Response text
    pub content: String,

    /// Model that produced the response
    pub model: String,

    /// Provider id that served the request
    pub provider: String,

    /// Token usage reported by the upstream
    pub usage: Usage,

    /// Source citations, when the provider supplies them (Perplexity)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub citations: Option<Vec<String>>,

    /// Upstream finish reason, when reported
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub finish_reason: Option<String>,
}
