//! Gateway HTTP module
//!
//! Axum route layer over the gateway core: chat, provider listing, batch
//! probe, and persisted settings management.

pub mod config;
pub mod handlers;
pub mod server;
pub mod settings_handlers;

pub use config::GatewayConfig;
pub use handlers::GatewayState;
