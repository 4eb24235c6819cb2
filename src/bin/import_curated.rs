// src/bin/import_curated.rs
// Run with: cargo run --bin import_curated -- curated.csv
use anyhow::anyhow;
use clap::Parser;
use dotenv::dotenv;
use env_logger;
use log::info;

use deposit_rates::config::AppConfig;
use deposit_rates::services::curated::import_curated_file;
use deposit_rates::services::pipeline::seoul_today;
use deposit_rates::services::store::CatalogStore;

/// Import hand-maintained products (cma, bill, els, bond) from a CSV file with
/// the header `id,bank,name,category,baseRate,topRate,termMonths`.
#[derive(Parser, Debug)]
struct Args {
    /// CSV file to import
    csv: String,

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

    let report = import_curated_file(&store, &args.csv, seoul_today())
        .map_err(|e| anyhow!("importing {} failed: {}", args.csv, e))?;

    info!(
        "Curated import into {}: {} added, {} updated, {} unchanged, {} skipped",
        path, report.added, report.updated, report.unchanged, report.skipped
    );
    Ok(())
}
