//! `canopy seed`: load the starter trees, insects and sightings

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use canopy_server::db::{create_pool, run_migrations, seed};
use canopy_server::CanopyConfig;

/// Arguments for the seed command
#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Remove the seeded sightings instead of adding data
    #[arg(long)]
    pub undo: bool,

    /// Database URL (default: sqlite://canopy.db)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_seed(args: SeedArgs, config_path: Option<&Path>) -> Result<()> {
    let file = CanopyConfig::load(config_path).context("Failed to load configuration")?;
    let database_url = args.database_url.unwrap_or(file.database.url);

    let pool = create_pool(&database_url)
        .await
        .with_context(|| format!("Failed to open database {}", database_url))?;
    run_migrations(&pool)
        .await
        .context("Failed to apply schema")?;

    if args.undo {
        let removed = seed::undo(&pool).await.context("Failed to undo seed")?;
        println!("Removed {} seeded sightings", removed);
    } else {
        let report = seed::run(&pool).await.context("Failed to seed database")?;
        println!(
            "Seeded {} trees, {} insects, {} sightings",
            report.trees_created, report.insects_created, report.associations_created
        );
    }

    pool.close().await;
    Ok(())
}
