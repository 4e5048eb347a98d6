//! dimgur server: entry point for running the HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use dimgur::store::SqliteStore;
use dimgur::{api, init_logging, ServiceConfig, VoteService};

#[derive(Parser)]
#[command(name = "dimgur-server", about = "dimgur signed vote and comment API")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "DIMGUR_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "DIMGUR_BIND_ADDR")]
    bind: Option<SocketAddr>,

    /// SQLite database file, or ":memory:".
    #[arg(long, env = "DIMGUR_DATABASE")]
    database: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DIMGUR_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServiceConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(database) = self.database {
            config.database_path = database;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    init_logging(config.log_format, &config.log_level).context("initialising logging")?;

    let store = if config.is_in_memory() {
        tracing::warn!("using an in-memory database; votes will not persist");
        SqliteStore::open_memory()
    } else {
        SqliteStore::open(&config.database_path)
    }
    .with_context(|| format!("opening database {}", config.database_path))?;

    let service = Arc::new(VoteService::new(store, config.policy()));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    api::serve(listener, service, shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
