// src/bin/update_rates.rs
// Run with: cargo run --bin update_rates
use anyhow::anyhow;
use clap::Parser;
use dotenv::dotenv;
use env_logger;
use log::{error, info};

use deposit_rates::config::AppConfig;
use deposit_rates::services::fetcher::Fetcher;
use deposit_rates::services::pipeline::refresh;
use deposit_rates::services::store::CatalogStore;

/// Fetch current deposit, savings and parking rates and merge them into the catalog.
#[derive(Parser, Debug)]
struct Args {
    /// Catalog file (overrides CATALOG_PATH)
    #[arg(long)]
    catalog: Option<String>,

    /// Minimum batch size accepted by the integrity guard (overrides MIN_BATCH_SIZE)
    #[arg(long)]
    min_batch: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(path) = args.catalog {
        config.catalog_path = path;
    }
    if let Some(min) = args.min_batch {
        config.min_batch_size = min;
    }

    let store = CatalogStore::new(&config.catalog_path);
    let fetcher = Fetcher::from_config(&config);

    info!("Refreshing rates into {}", store.path().display());
    let outcome = refresh(&fetcher, &store, config.min_batch_size)
        .await
        .map_err(|e| anyhow!("rate refresh failed: {}", e))?;

    if outcome.is_committed() {
        info!("Run {}", outcome);
        Ok(())
    } else {
        error!("Run {}", outcome);
        std::process::exit(1);
    }
}
