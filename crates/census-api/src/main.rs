//! # census-api: Binary Entry Point
//!
//! Reads configuration from the environment, applies command-line
//! overrides, opens the tally store, and serves the HTTP API.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use census_api::state::{
    AppConfig, AppState, ENV_BIND, ENV_LOG_FORMAT, ENV_PORT, ENV_STATIC_DIR,
};
use census_store::config::{ENV_BACKEND, ENV_DATABASE_URL};
use census_store::{CensusStore, StoreConfig};

/// zk-census tally server.
///
/// Every flag falls back to its environment variable, then to the default.
#[derive(Parser, Debug)]
#[command(name = "census-api", version, about, long_about = None)]
struct Cli {
    /// HTTP port [env: PORT, default 3000].
    #[arg(long)]
    port: Option<u16>,

    /// Bind address [env: CENSUS_BIND, default 0.0.0.0].
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Tally backend, `memory` or `postgres` [env: CENSUS_BACKEND].
    #[arg(long)]
    backend: Option<String>,

    /// Postgres connection URL [env: DATABASE_URL].
    #[arg(long)]
    database_url: Option<String>,

    /// Directory served for unmatched paths [env: CENSUS_STATIC_DIR].
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Emit JSON log lines [env: CENSUS_LOG_FORMAT=json].
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Value given on the command line for an environment variable, if any.
    fn flag_for(&self, var: &str) -> Option<String> {
        match var {
            ENV_PORT => self.port.map(|p| p.to_string()),
            ENV_BIND => self.bind.map(|b| b.to_string()),
            ENV_BACKEND => self.backend.clone(),
            ENV_DATABASE_URL => self.database_url.clone(),
            ENV_STATIC_DIR => self.static_dir.as_ref().map(|d| d.display().to_string()),
            ENV_LOG_FORMAT if self.log_json => Some("json".to_string()),
            _ => None,
        }
    }

    /// Command-line flags first, then the process environment.
    fn lookup(&self, var: &str) -> Option<String> {
        self.flag_for(var).or_else(|| std::env::var(var).ok())
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config =
        AppConfig::from_lookup(|var| cli.lookup(var)).context("invalid HTTP configuration")?;
    init_tracing(app_config.log_json);

    let store_config =
        StoreConfig::from_lookup(|var| cli.lookup(var)).context("invalid store configuration")?;
    tracing::info!(config = ?store_config, "opening census store");

    let store = CensusStore::open(&store_config)
        .await
        .with_context(|| format!("failed to open {} census backend", store_config.backend))?;

    let addr = app_config.socket_addr();
    let state = AppState::new(store, app_config).context("failed to register metrics")?;
    let app = census_api::app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "census API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
