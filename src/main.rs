//! IoT bridge proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────┐
//!                     │                   BRIDGE PROXY                    │
//!   Device POST       │  ┌─────────┐   ┌──────────┐   ┌───────────────┐   │
//!   ──────────────────┼─▶│   net   │──▶│   http   │──▶│   upstream    │───┼──▶ Vendor
//!                     │  │listener │   │ request  │   │ (spoofed Host)│   │    backend
//!                     │  └─────────┘   └──────────┘   └───────┬───────┘   │
//!                     │                                       │           │
//!   Device response   │  ┌──────────┐   ┌──────────┐          │           │
//!   ◀─────────────────┼──│   http   │◀──│ rewrite  │◀─────────┘           │
//!                     │  │ response │   │ (ip sub) │                      │
//!                     │  └──────────┘   └──────────┘                      │
//!                     └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use iot_bridge_proxy::config::loader::{apply_env_overrides, finalize, read_config};
use iot_bridge_proxy::net::Listener;
use iot_bridge_proxy::observability::{logging, metrics};
use iot_bridge_proxy::{HttpForwarder, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "iot-bridge-proxy")]
#[command(about = "Forwards device traffic to the vendor backend and redirects its MQTT broker", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the file and LISTEN_ADDRESS.
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level, overriding the file and LOG_LEVEL.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = read_config(cli.config.as_deref())?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    let config = Arc::new(finalize(config)?);

    logging::init(&config.observability.log_level);
    tracing::info!("iot-bridge-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        target_host = %config.upstream.target_host,
        upstream_ip = config.upstream.upstream_ip.as_deref().unwrap_or("-"),
        scheme = %config.upstream.scheme,
        substitute_ip = %config.rewrite.substitute_ip,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated together with the rest of the configuration.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let forwarder = Arc::new(HttpForwarder::new(&config)?);
    let listener = Listener::bind(&config.listener).await?;
    let server = HttpServer::new(Arc::clone(&config), forwarder)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
