use anyhow::Context;
use dotenv::dotenv;
use env_logger;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use warp::Filter;

use deposit_rates::config::AppConfig;
use deposit_rates::routes;
use deposit_rates::services::fetcher::Fetcher;
use deposit_rates::services::pipeline::refresh;
use deposit_rates::services::store::CatalogStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env();
    let store = Arc::new(CatalogStore::new(&config.catalog_path));
    let fetcher = Arc::new(Fetcher::from_config(&config));
    info!("Serving catalog from {}", store.path().display());

    let scheduler = JobScheduler::new().await.context("creating scheduler")?;
    let job_store = store.clone();
    let job_fetcher = fetcher.clone();
    let min_batch_size = config.min_batch_size;
    let job = Job::new_async(config.refresh_cron.as_str(), move |_uuid, _l| {
        let store = job_store.clone();
        let fetcher = job_fetcher.clone();
        Box::pin(async move {
            info!("Scheduled rate refresh starting");
            match refresh(&fetcher, &store, min_batch_size).await {
                Ok(outcome) => info!("Scheduled rate refresh {}", outcome),
                Err(e) => error!("Scheduled rate refresh failed: {}", e),
            }
        })
    })
    .with_context(|| format!("creating refresh job for cron {}", config.refresh_cron))?;
    scheduler.add(job).await.context("adding refresh job")?;
    scheduler.start().await.context("starting scheduler")?;
    info!("Rate refresh scheduled: {}", config.refresh_cron);

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET"]);

    let api = routes::routes(store).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api)
        .run(addr)
        .await;

    Ok(())
}
