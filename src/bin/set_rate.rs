// src/bin/set_rate.rs
// Run with: cargo run --bin set_rate -- <ID> <RATE>
use anyhow::anyhow;
use clap::Parser;
use dotenv::dotenv;
use env_logger;
use log::{info, warn};

use deposit_rates::config::AppConfig;
use deposit_rates::services::manual::{update_product_rate, ManualUpdate};
use deposit_rates::services::pipeline::seoul_today;
use deposit_rates::services::store::CatalogStore;

/// Record a manually observed rate for one product.
#[derive(Parser, Debug)]
struct Args {
    /// Product id
    id: String,

    /// New top rate in percent
    rate: f64,

    /// Catalog file (overrides CATALOG_PATH)
    #[arg(long)]
    catalog: Option<String>,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let path = args.catalog.unwrap_or_else(|| AppConfig::from_env().catalog_path);
    let store = CatalogStore::new(&path);

    match update_product_rate(&store, &args.id, args.rate, seoul_today())
        .map_err(|e| anyhow!("updating {} failed: {}", args.id, e))?
    {
        ManualUpdate::Changed { bank, from, to } => match from {
            Some(from) => info!("[{}] {}: {}% -> {}%, saved to {}", bank, args.id, from, to, path),
            None => info!("[{}] {}: rate set to {}%, saved to {}", bank, args.id, to, path),
        },
        ManualUpdate::HistoryRepaired => info!("{}: history now ends on {}%", args.id, args.rate),
        ManualUpdate::Unchanged => info!("{}: rate unchanged, nothing saved", args.id),
        ManualUpdate::Unreadable(reason) => {
            warn!("{} in {} cannot be edited automatically: {}", args.id, path, reason);
            return Err(anyhow!("product {} is unreadable: {}", args.id, reason));
        }
        ManualUpdate::NotFound => {
            warn!("No product with id {} in {}", args.id, path);
            return Err(anyhow!("product {} not found", args.id));
        }
    }
    Ok(())
}
