//! Re-exports from all modules

mod client;
mod gateway;
mod message;
mod provider;
mod store;

pub mod gate;

#[cfg(test)]
pub(crate) mod mock_server;

use thiserror::Error;

/// Result type for llm-gate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for llm-gate operations.
///
/// Configuration errors (`ProviderNotFound`, `ProviderDisabled`,
/// `MissingApiKey`, `UnsupportedProvider`) are detected before any network
/// call. Transport errors (`Timeout`, `Transport`) and protocol errors
/// (`Api`) carry the provider identity so callers can map them to response
/// codes without string matching.
#[derive(Debug, Error)]
pub enum Error {
    /// Provider id is not present in the configuration store
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// Provider exists but is disabled
    #[error("Provider is disabled: {0}")]
    ProviderDisabled(String),

    /// Provider exists but has no API key configured
    #[error("API key not configured for: {0}")]
    MissingApiKey(String),

    /// Provider id has no adapter implementation
    #[error("Unknown provider: {0}")]
    UnsupportedProvider(String),

    /// Upstream request timed out
    #[error("{provider} API timeout: request exceeded the allotted time")]
    Timeout {
        /// Provider that timed out
        provider: String,
    },

    /// Connection-level failure talking to the upstream
    #[error("{provider} connection error: {detail}")]
    Transport {
        /// Provider the request was addressed to
        provider: String,
        /// Underlying transport failure description
        detail: String,
    },

    /// Non-success upstream status or malformed response body
    #[error("{provider} API error ({status}): {body}")]
    Api {
        /// Provider that answered
        provider: String,
        /// Upstream HTTP status code
        status: u16,
        /// Response body, truncated to 500 characters
        body: String,
    },

    /// Configuration storage error
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error was detected before any network call
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ProviderNotFound(_)
                | Error::ProviderDisabled(_)
                | Error::MissingApiKey(_)
                | Error::UnsupportedProvider(_)
        )
    }

    /// Whether this error came from the upstream (transport or protocol)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Transport { .. } | Error::Api { .. }
        )
    }
}

pub use client::{
    ChatGptClient, ClaudeClient, Client, GeminiClient, MoonshotClient, PerplexityClient,
};
pub use gateway::{Gateway, ProbeOutcome, ProviderSummary};
pub use message::{ChatRequest, ChatResult, Message, MessageRole, Usage};
pub use provider::{create_client, resolve};
pub use store::{mask_api_key, ConfigStore, ProviderDescriptor, ProviderUpdate};
