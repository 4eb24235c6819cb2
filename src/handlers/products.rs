// src/handlers/products.rs
use warp::reply::Json;
use warp::Rejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use log::{error, info};

use crate::models::CatalogEntry;
use crate::services::store::CatalogStore;
use super::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    id: String,
    top_rate: Value,
    history: Value,
}

fn load_catalog(store: &CatalogStore) -> Result<Vec<CatalogEntry>, Rejection> {
    store.load().map_err(|e| {
        error!("Failed to read catalog: {}", e);
        warp::reject::custom(ApiError::store_error(e.to_string()))
    })
}

fn find_product(store: &CatalogStore, id: &str) -> Result<CatalogEntry, Rejection> {
    load_catalog(store)?
        .into_iter()
        .find(|e| e.id().as_deref() == Some(id))
        .ok_or_else(|| warp::reject::custom(ApiError::not_found(format!("No product with id {}", id))))
}

pub async fn list_products(query: ProductQuery, store: Arc<CatalogStore>) -> Result<Json, Rejection> {
    info!("Handling request to list products (category: {:?})", query.category);

    let products: Vec<CatalogEntry> = load_catalog(&store)?
        .into_iter()
        .filter(|e| {
            query
                .category
                .as_deref()
                .map_or(true, |c| e.category().map_or(false, |own| own.as_str() == c))
        })
        .collect();

    Ok(warp::reply::json(&products))
}

pub async fn get_product(id: String, store: Arc<CatalogStore>) -> Result<Json, Rejection> {
    info!("Handling request to get product {}", id);
    let product = find_product(&store, &id)?;
    Ok(warp::reply::json(&product))
}

pub async fn get_history(id: String, store: Arc<CatalogStore>) -> Result<Json, Rejection> {
    info!("Handling request to get history of {}", id);
    let product = find_product(&store, &id)?;
    let value = serde_json::to_value(&product).map_err(|e| {
        error!("Failed to encode product {}: {}", id, e);
        warp::reject::custom(ApiError::store_error(e.to_string()))
    })?;
    Ok(warp::reply::json(&HistoryResponse {
        id,
        top_rate: value.get("topRate").cloned().unwrap_or(Value::Null),
        history: value.get("history").cloned().unwrap_or_else(|| Value::Array(Vec::new())),
    }))
}
