// src/routes.rs
use std::sync::Arc;
use warp::reject::Rejection;
use crate::handlers::products::{get_history, get_product, list_products, ProductQuery};
use crate::services::store::CatalogStore;
use log::info;

use std::convert::Infallible;
use warp::{Filter, Reply};
use crate::handlers::error::ApiError;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = api_error.message.clone();
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = "Invalid query string".to_string();
    } else {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(store: Arc<CatalogStore>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let store_filter = warp::any().map(move || store.clone());

    let products_route = warp::path!("api" / "v1" / "products")
        .and(warp::get())
        .and(warp::query::<ProductQuery>())
        .and(store_filter.clone())
        .and_then(list_products);

    let product_route = warp::path!("api" / "v1" / "products" / String)
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(get_product);

    let history_route = warp::path!("api" / "v1" / "products" / String / "history")
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(get_history);

    info!("All routes configured successfully.");

    products_route
        .or(product_route)
        .or(history_route)
        .recover(handle_rejection)
}
