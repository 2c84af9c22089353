//! HTTP request handlers for persisted provider settings
//!
//! API keys never leave the store unmasked through these endpoints.

use crate::gate::handlers::{error_response, GatewayState};
use crate::store::{mask_api_key, ProviderDescriptor, ProviderUpdate};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

fn masked_provider_json(descriptor: &ProviderDescriptor) -> Value {
    json!({
        "name": descriptor.display_name,
        "api_key": mask_api_key(&descriptor.api_key),
        "model": descriptor.model,
        "base_url": descriptor.base_url,
        "enabled": descriptor.enabled,
    })
}

/// Get all provider configurations, API keys masked
pub async fn get_all_providers(
    State(state): State<GatewayState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let store = state.gateway.store();
    let providers = store.list().map_err(|err| error_response(&err))?;
    let default = store
        .default_provider_id()
        .map_err(|err| error_response(&err))?;

    let mut masked = Map::new();
    for (id, descriptor) in &providers {
        masked.insert(id.clone(), masked_provider_json(descriptor));
    }

    Ok(Json(json!({
        "providers": Value::Object(masked),
        "default_provider": default,
    })))
}

/// Get a single provider configuration, API key masked
pub async fn get_provider(
    State(state): State<GatewayState>,
    Path(provider_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let descriptor = state
        .gateway
        .store()
        .descriptor(&provider_id)
        .map_err(|err| error_response(&err))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": format!("Provider not found: {}", provider_id) })),
            )
        })?;

    let mut body = masked_provider_json(&descriptor);
    body["id"] = Value::String(provider_id);
    Ok(Json(body))
}

/// Update a provider configuration
pub async fn update_provider(
    State(state): State<GatewayState>,
    Path(provider_id): Path<String>,
    Json(update): Json<ProviderUpdate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if update.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "No updates provided" })),
        ));
    }

    let updated = state
        .gateway
        .store()
        .update_provider(&provider_id, update)
        .map_err(|err| error_response(&err))?;

    let mut provider = masked_provider_json(&updated);
    provider["id"] = Value::String(provider_id);
    Ok(Json(json!({ "success": true, "provider": provider })))
}

/// Body for setting the default provider
#[derive(Debug, Deserialize)]
pub struct DefaultProviderRequest {
    pub provider: String,
}

/// Set the default provider
pub async fn set_default_provider(
    State(state): State<GatewayState>,
    Json(request): Json<DefaultProviderRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .gateway
        .store()
        .set_default_provider(&request.provider)
        .map_err(|err| error_response(&err))?;

    Ok(Json(json!({
        "success": true,
        "default_provider": request.provider,
    })))
}

/// Reset all providers to their environment defaults
pub async fn reset_providers(
    State(state): State<GatewayState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let providers = state
        .gateway
        .store()
        .reset()
        .map_err(|err| error_response(&err))?;

    let mut masked = Map::new();
    for (id, descriptor) in &providers {
        masked.insert(id.clone(), masked_provider_json(descriptor));
    }
    Ok(Json(json!({ "success": true, "providers": Value::Object(masked) })))
}
