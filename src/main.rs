//! habraproxy
//!
//! A forwarding proxy for a single upstream site built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  HABRAPROXY                  │
//!                        │                                              │
//!     Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────┐   │
//!     ───────────────────┼─▶│  http   │──▶│ headers  │──▶│ upstream │───┼──▶ Upstream
//!                        │  │ server  │   │ (filter) │   │  client  │   │    host
//!                        │  └─────────┘   └──────────┘   └────┬─────┘   │
//!                        │                                    │         │
//!                        │                                    ▼         │
//!     Client Response    │  ┌─────────┐   ┌──────────┐   ┌──────────┐   │
//!     ◀──────────────────┼──│response │◀──│ rewrite  │◀──│ content  │◀──┼─── Upstream
//!                        │  │         │   │ words +  │   │  type    │   │    response
//!                        │  └─────────┘   │ links    │   │ router   │   │
//!                        │                └──────────┘   └──────────┘   │
//!                        │                                              │
//!                        │   config · observability · lifecycle         │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use habraproxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use habraproxy::lifecycle::startup;
use habraproxy::observability::logging;

#[derive(Parser)]
#[command(name = "habraproxy")]
#[command(about = "Forwarding proxy that decorates six-letter words", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Upstream base URL, overrides `upstream.base_url`.
    #[arg(short, long)]
    upstream: Option<String>,

    /// Log filter used when RUST_LOG is unset, overrides `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(upstream) = self.upstream {
            config.upstream.base_url = upstream;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability)?;

    tracing::info!("habraproxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        upstream_timeout_secs = config.upstream.timeout_secs,
        word_length = config.rewrite.word_length,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
