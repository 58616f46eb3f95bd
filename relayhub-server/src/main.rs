//! Relayhub -- real-time WebSocket message hub.
//!
//! Clients connect to `ws://<addr>/ws`, are identified by the source port of
//! their connection and exchange text messages through the hub:
//! `id`, `list` and `relay|users=<id>;<id>,body=<text>`.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080
//! cargo run --bin relayhub
//!
//! # Run on custom address
//! cargo run --bin relayhub -- --bind 127.0.0.1:9000
//!
//! # Or via environment variable
//! RELAYHUB_ADDR=127.0.0.1:9000 cargo run --bin relayhub
//! ```

use clap::Parser;
use relayhub_server::config::{HubCliArgs, HubConfig};
use relayhub_server::server;

#[tokio::main]
async fn main() {
    let cli = HubCliArgs::parse();

    let config = HubConfig::from_cli(&cli);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting relay hub");

    match server::start_server(&config.bind_addr).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "relay hub listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "relay hub server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start relay hub");
            std::process::exit(1);
        }
    }
}
