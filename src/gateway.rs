//! Gateway core: chat orchestration and the multi-provider probe fan-out

use crate::client::truncate_chars;
use crate::message::{ChatRequest, ChatResult, Message};
use crate::provider::{create_client, resolve};
use crate::store::ConfigStore;
use crate::Result;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Maximum characters of response content kept in a probe excerpt
const EXCERPT_LIMIT: usize = 500;

/// Provider status entry returned by [`Gateway::list_providers`].
/// Carries credential presence only, never the key itself.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub display_name: String,
    pub model: String,
    pub enabled: bool,
    pub has_credential: bool,
    pub is_default: bool,
}

/// Outcome of probing one provider.
///
/// Exactly one outcome exists per requested provider id; a failed probe
/// carries the failure text instead of a response excerpt.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    /// Provider id the probe was addressed to
    pub provider: String,

    /// Whether the provider answered successfully
    pub success: bool,

    /// Response content excerpt, truncated to 500 characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Failure description when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Model that answered, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Wall-clock time for this provider's probe
    pub elapsed_ms: u64,
}

/// The gateway core. Stateless across calls; all per-provider settings are
/// read from the configuration store at call time.
pub struct Gateway {
    store: Arc<ConfigStore>,
}

impl Gateway {
    /// Create a gateway over a configuration store
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Gateway { store }
    }

    /// Access the underlying configuration store
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Execute one normalized chat call.
    ///
    /// An absent `provider` falls back to the configured default. Resolution
    /// failures and adapter failures propagate unchanged; there is no retry.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResult> {
        let provider_id = match request.provider {
            Some(ref id) => id.clone(),
            None => self.store.default_provider_id()?,
        };

        let descriptor = resolve(&self.store, &provider_id)?;
        let client = create_client(&descriptor)?;

        info!(provider = %provider_id, model = %descriptor.model, "dispatching chat request");

        let result = client
            .chat(
                &request.messages,
                request.system_prompt.as_deref(),
                request.max_tokens,
                request.temperature,
            )
            .await;

        if let Err(ref err) = result {
            warn!(provider = %provider_id, model = %descriptor.model, error = %err, "chat request failed");
        }
        result
    }

    /// List all configured providers with their status
    pub fn list_providers(&self) -> Result<Vec<ProviderSummary>> {
        let default = self.store.default_provider_id()?;
        let providers = self.store.list()?;

        Ok(providers
            .into_iter()
            .map(|(id, descriptor)| ProviderSummary {
                is_default: id == default,
                has_credential: !descriptor.api_key.is_empty(),
                id,
                display_name: descriptor.display_name,
                model: descriptor.model,
                enabled: descriptor.enabled,
            })
            .collect())
    }

    /// Probe a set of providers concurrently with one test message.
    ///
    /// Every provider is dispatched at once and all probes run to completion;
    /// one provider's failure or slowness never delays, cancels, or affects
    /// another's outcome or timing. The returned outcomes are aligned with
    /// the input id order, one per requested id.
    pub async fn probe_providers(
        &self,
        provider_ids: &[String],
        test_message: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Vec<ProbeOutcome> {
        let probes = provider_ids.iter().map(|provider_id| {
            let provider_id = provider_id.clone();
            let messages = vec![Message::user(test_message)];
            async move {
                let started = Instant::now();
                let outcome = self
                    .probe_one(&provider_id, &messages, max_tokens, temperature)
                    .await;
                let elapsed_ms = started.elapsed().as_millis() as u64;

                match outcome {
                    Ok(result) => ProbeOutcome {
                        provider: provider_id,
                        success: true,
                        response: Some(truncate_chars(&result.content, EXCERPT_LIMIT)),
                        error: None,
                        model: Some(result.model),
                        elapsed_ms,
                    },
                    Err(err) => ProbeOutcome {
                        provider: provider_id,
                        success: false,
                        response: None,
                        error: Some(err.to_string()),
                        model: None,
                        elapsed_ms,
                    },
                }
            }
        });

        join_all(probes).await
    }

    async fn probe_one(
        &self,
        provider_id: &str,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatResult> {
        let descriptor = resolve(&self.store, provider_id)?;
        let client = create_client(&descriptor)?;
        client.chat(messages, None, max_tokens, temperature).await
    }
}
