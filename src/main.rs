use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use fixture_reconciler::config::{AppConfig, DEFAULT_CONFIG_PATH};
use fixture_reconciler::db::Store;
use fixture_reconciler::monitoring::logger;
use fixture_reconciler::settlement::Reconciler;

/// Settle pending bets against the final scores in the local database.
#[derive(Debug, Parser)]
#[command(name = "fixture-reconciler", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the per-bet audit trail as JSON after the summary
    #[arg(long)]
    audit: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    logger::init_logging(&config.monitoring)?;

    tracing::info!(
        config = %cli.config.display(),
        database = %config.database.path,
        scorer = %config.matching.scorer,
        min_match_score = config.matching.min_match_score,
        "Fixture reconciler starting"
    );

    if let Some(dir) = Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }
    let store = Store::new(&config.database.path).await?;
    let rules = config.matching_rules();

    let batch = Reconciler::new(&store, &rules).settle_pending_bets().await?;

    println!("{batch}");
    if cli.audit {
        println!("{}", serde_json::to_string_pretty(&batch.results)?);
    }

    Ok(())
}
