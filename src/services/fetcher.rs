// src/services/fetcher.rs
use log::{error, info, warn};

use crate::config::AppConfig;
use crate::models::{Category, FetchedProduct};
use crate::services::finlife::FinlifeClient;
use crate::services::parking::ParkingScraper;

/// One fetch interface over every source. Fetches never fail: a source that
/// errors or is not configured yields no products for its category.
pub struct Fetcher {
    finlife: Option<FinlifeClient>,
    parking: Option<ParkingScraper>,
}

impl Fetcher {
    pub fn new(finlife: Option<FinlifeClient>, parking: Option<ParkingScraper>) -> Self {
        Fetcher { finlife, parking }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let finlife = config.finlife_api_key.as_ref().and_then(|key| {
            FinlifeClient::with_base_url(key.clone(), config.finlife_base_url.clone())
                .map_err(|e| error!("Could not build finlife client: {}", e))
                .ok()
        });
        let parking = config.parking_source_url.as_ref().and_then(|url| {
            ParkingScraper::new(url.clone())
                .map_err(|e| error!("Could not build parking scraper: {}", e))
                .ok()
        });
        Fetcher::new(finlife, parking)
    }

    pub async fn fetch(&self, category: &Category) -> Vec<FetchedProduct> {
        let result = match category {
            Category::Deposit | Category::Savings => match &self.finlife {
                Some(client) => client.fetch_products(category).await,
                None => {
                    warn!("No finlife API key configured, skipping {}", category);
                    return Vec::new();
                }
            },
            Category::Parking => match &self.parking {
                Some(scraper) => scraper.fetch_products().await,
                None => {
                    info!("No parking source configured, skipping {}", category);
                    return Vec::new();
                }
            },
            _ => {
                warn!("Category '{}' is curated and never fetched", category);
                return Vec::new();
            }
        };

        match result {
            Ok(products) => products,
            Err(e) => {
                error!("Fetching {} failed: {}", category, e);
                Vec::new()
            }
        }
    }

    /// One consolidated batch across all managed categories.
    pub async fn fetch_all(&self) -> Vec<FetchedProduct> {
        let mut batch = Vec::new();
        for category in Category::MANAGED.iter() {
            let mut products = self.fetch(category).await;
            info!("Fetched {} {} products", products.len(), category);
            batch.append(&mut products);
        }
        batch
    }
}
