//! Gateway HTTP server

use crate::gate::config::GatewayConfig;
use crate::gate::handlers::{self, GatewayState};
use crate::gate::settings_handlers;
use crate::Gateway;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

/// Build the gateway router over the given state.
///
/// The admin frontend is served from `frontend_dir` when it exists;
/// otherwise the root route answers with a JSON banner.
pub fn build_router(state: GatewayState, frontend_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        // Chat API
        .route("/api/ai/chat", post(handlers::chat_handler))
        .route("/api/ai/providers", get(handlers::list_providers_handler))
        .route("/api/ai/test", post(handlers::probe_handler))
        // Settings API
        .route("/api/settings/providers", get(settings_handlers::get_all_providers))
        .route(
            "/api/settings/provider/:provider_id",
            get(settings_handlers::get_provider).put(settings_handlers::update_provider),
        )
        .route(
            "/api/settings/default-provider",
            put(settings_handlers::set_default_provider),
        )
        .route("/api/settings/reset", post(settings_handlers::reset_providers))
        // Utility endpoints
        .route("/health", get(handlers::health_check));

    match frontend_dir {
        Some(dir) if dir.exists() => {
            let admin = dir.join("admin.html");
            app = app.nest_service("/static", ServeDir::new(dir));
            if admin.exists() {
                app = app.route_service("/", ServeFile::new(admin));
            }
        }
        _ => {
            app = app.route("/", get(root_banner));
        }
    }

    app.with_state(state)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(logging_middleware))
}

/// Start the gateway server
pub async fn start_server(config: GatewayConfig, gateway: Arc<Gateway>) -> anyhow::Result<()> {
    let state = GatewayState { gateway };
    let frontend = std::path::PathBuf::from("frontend");
    let app = build_router(state, Some(&frontend));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting gateway on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_banner() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "LLM gateway is running" }))
}

/// Logging middleware
async fn logging_middleware(req: Request, next: Next) -> axum::response::Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    info!("{} {} {} {:?}", method, uri, status, duration);

    response
}
