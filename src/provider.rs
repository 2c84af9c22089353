//! Provider resolution and client creation

use crate::client::{
    ChatGptClient, ClaudeClient, Client, GeminiClient, MoonshotClient, PerplexityClient,
};
use crate::store::{ConfigStore, ProviderDescriptor};
use crate::{Error, Result};

/// Provider ids with a registered client implementation
const SUPPORTED_PROVIDERS: &[&str] = &[
    "claude",
    "openai",
    "gemini-pro",
    "gemini-flash",
    "moonshot",
    "perplexity",
];

/// Resolve a provider id to a usable descriptor.
///
/// Validation order is significant so error messages match the actual cause:
/// existence, then enablement, then credential, then adapter availability.
pub fn resolve(store: &ConfigStore, provider_id: &str) -> Result<ProviderDescriptor> {
    let descriptor = store
        .descriptor(provider_id)?
        .ok_or_else(|| Error::ProviderNotFound(provider_id.to_string()))?;

    if !descriptor.enabled {
        return Err(Error::ProviderDisabled(provider_id.to_string()));
    }

    if descriptor.api_key.is_empty() {
        return Err(Error::MissingApiKey(provider_id.to_string()));
    }

    if !SUPPORTED_PROVIDERS.contains(&provider_id) {
        return Err(Error::UnsupportedProvider(provider_id.to_string()));
    }

    Ok(descriptor)
}

/// Create a provider client from a resolved descriptor.
///
/// Returns a trait object so callers are decoupled from concrete provider
/// types. Adding a new provider only requires a new match arm here.
pub fn create_client(descriptor: &ProviderDescriptor) -> Result<Box<dyn Client>> {
    let ProviderDescriptor {
        id,
        api_key,
        model,
        base_url,
        ..
    } = descriptor;

    match id.as_str() {
        "claude" => Ok(Box::new(ClaudeClient::new(api_key, model, base_url)?)),
        "openai" => Ok(Box::new(ChatGptClient::new(api_key, model, base_url)?)),
        "gemini-pro" | "gemini-flash" => {
            Ok(Box::new(GeminiClient::new(api_key, model, base_url)?))
        }
        "moonshot" => Ok(Box::new(MoonshotClient::new(api_key, model, base_url)?)),
        "perplexity" => Ok(Box::new(PerplexityClient::new(api_key, model, base_url)?)),
        other => Err(Error::UnsupportedProvider(other.to_string())),
    }
}
