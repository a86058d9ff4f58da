//! `canopy serve`: run the HTTP API
//!
//! Settings resolve as flag > environment > config file > default.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use canopy_server::db::{create_pool_with_options, run_migrations};
use canopy_server::{run_server, CanopyConfig, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:3030)
    #[arg(long, short = 'b', env = "CANOPY_BIND")]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (default: sqlite://canopy.db)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl ServeArgs {
    /// Layer these arguments over the file config.
    fn server_config(&self, file: &CanopyConfig) -> ServerConfig {
        let mut config = file.server_config();
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if self.cors_permissive {
            config.cors_permissive = true;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let file = CanopyConfig::load(config_path).context("Failed to load configuration")?;
    let config = args.server_config(&file);
    let database_url = args
        .database_url
        .as_deref()
        .unwrap_or(&file.database.url);

    tracing::info!("Starting canopy server on {}", config.bind_addr);

    let pool = create_pool_with_options(database_url, file.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", database_url))?;
    run_migrations(&pool)
        .await
        .context("Failed to apply schema")?;

    // Blocks until shutdown
    run_server(pool, config).await.context("Server error")?;

    Ok(())
}
