//! HTTP request handlers for the chat API

use crate::message::{default_max_tokens, default_temperature};
use crate::{ChatRequest, ChatResult, Error, Gateway};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Gateway state shared across handlers
#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<Gateway>,
}

/// Map a gateway error to an HTTP status and JSON error body.
///
/// Configuration errors are the caller's to correct (404/400); upstream
/// failures surface as 502 so callers can tell them apart from gateway
/// faults.
pub(crate) fn error_response(err: &Error) -> (StatusCode, Json<Value>) {
    let status = match err {
        Error::ProviderNotFound(_) => StatusCode::NOT_FOUND,
        Error::ProviderDisabled(_) | Error::MissingApiKey(_) | Error::UnsupportedProvider(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::Timeout { .. } | Error::Transport { .. } | Error::Api { .. } => {
            StatusCode::BAD_GATEWAY
        }
        Error::Storage(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "detail": err.to_string() })))
}

/// Handle a normalized chat request
pub async fn chat_handler(
    State(state): State<GatewayState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResult>, (StatusCode, Json<Value>)> {
    match state.gateway.chat(request).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            error!("chat request failed: {}", err);
            Err(error_response(&err))
        }
    }
}

/// List all providers with their status
pub async fn list_providers_handler(
    State(state): State<GatewayState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let providers = state
        .gateway
        .list_providers()
        .map_err(|err| error_response(&err))?;
    let default = state
        .gateway
        .store()
        .default_provider_id()
        .map_err(|err| error_response(&err))?;

    Ok(Json(json!({ "providers": providers, "default": default })))
}

/// Body of a batch-probe request
#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    /// Provider ids to probe; absent means "all configured providers"
    #[serde(default)]
    pub providers: Option<Vec<String>>,

    /// Test message sent to each provider
    #[serde(default = "default_probe_message")]
    pub message: String,

    #[serde(default = "default_probe_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_probe_message() -> String {
    "Hi! Please reply with a short greeting.".to_string()
}

fn default_probe_max_tokens() -> u32 {
    // Probes only need an excerpt, not a full completion
    default_max_tokens().min(100)
}

/// Probe a set of providers concurrently with one test message
pub async fn probe_handler(
    State(state): State<GatewayState>,
    Json(request): Json<ProbeRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let provider_ids = match request.providers {
        Some(ids) => ids,
        None => state
            .gateway
            .store()
            .list()
            .map_err(|err| error_response(&err))?
            .keys()
            .cloned()
            .collect(),
    };

    if provider_ids.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "no providers to probe" })),
        ));
    }

    info!("probing {} providers", provider_ids.len());
    let outcomes = state
        .gateway
        .probe_providers(
            &provider_ids,
            &request.message,
            request.max_tokens,
            request.temperature,
        )
        .await;

    Ok(Json(json!({ "results": outcomes })))
}

/// Health check handler
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "llm-gate" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = error_response(&Error::ProviderNotFound("x".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = error_response(&Error::ProviderDisabled("x".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(&Error::MissingApiKey("x".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(&Error::Timeout {
            provider: "claude".into(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = error_response(&Error::Api {
            provider: "gemini".into(),
            status: 503,
            body: "unavailable".into(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = error_response(&Error::Config("broken".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_probe_request_defaults() {
        let request: ProbeRequest = serde_json::from_str("{}").unwrap();
        assert!(request.providers.is_none());
        assert!(!request.message.is_empty());
        assert_eq!(request.max_tokens, 100);
    }
}
