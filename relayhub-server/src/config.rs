//! Configuration for the relayhub server.
//!
//! The listen address is the only setting. It is taken from `--bind`, then
//! `RELAYHUB_ADDR` (via clap's `env` attribute), then the compiled default.
//! Log filtering is left to `RUST_LOG`.

/// Listen address used when neither `--bind` nor `RELAYHUB_ADDR` is set.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// CLI arguments for the hub.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Real-time WebSocket message hub")]
pub struct HubCliArgs {
    /// Address to listen on (host:port).
    #[arg(short, long, env = "RELAYHUB_ADDR")]
    pub bind: Option<String>,
}

/// Fully resolved hub configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Address to listen on (e.g., `0.0.0.0:8080`).
    pub bind_addr: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl HubConfig {
    /// Resolves the configuration from parsed CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &HubCliArgs) -> Self {
        Self {
            bind_addr: cli
                .bind
                .clone()
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}
