//! llm-gate binary
//!
//! Multi-provider LLM gateway server

use anyhow::Result;
use clap::Parser;
use llm_gate::gate::config::GatewayConfig;
use llm_gate::gate::server::start_server;
use llm_gate::{ConfigStore, Gateway};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// llm-gate: normalized chat across multiple LLM providers
#[derive(Parser, Debug)]
#[command(name = "llm-gate")]
#[command(about = "Multi-provider LLM gateway", long_about = None)]
struct Args {
    /// Host to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding the configuration database
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Print the stored provider configuration and exit
    #[arg(long)]
    validate: bool,
}

fn resolve_data_dir(arg: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = arg {
        return Ok(dir);
    }
    if let Ok(dir) = std::env::var("LLM_GATE_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("cannot determine a data directory; pass --data-dir"))?;
    Ok(base.join("llm-gate"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    let mut config = GatewayConfig::default();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let data_dir = resolve_data_dir(args.data_dir)?;
    let store = ConfigStore::open(&data_dir)?;
    let providers = store.list()?;
    info!(
        "Loaded {} providers from {}",
        providers.len(),
        data_dir.display()
    );

    if args.validate {
        for (id, provider) in &providers {
            println!(
                "  {} ({}): model={} enabled={} key={}",
                id,
                provider.display_name,
                provider.model,
                provider.enabled,
                if provider.api_key.is_empty() { "missing" } else { "set" }
            );
        }
        println!("Default provider: {}", store.default_provider_id()?);
        println!("\nConfiguration is valid");
        return Ok(());
    }

    let gateway = Arc::new(Gateway::new(Arc::new(store)));
    start_server(config, gateway).await
}
