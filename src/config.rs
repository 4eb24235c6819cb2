// src/config.rs
use log::warn;
use std::env;
use std::str::FromStr;

use crate::services::finlife::FINLIFE_API_BASE;
use crate::services::guard::MIN_BATCH_SIZE;

pub const DEFAULT_CATALOG_PATH: &str = "data.json";
pub const DEFAULT_PORT: u16 = 3030;
// sec min hour day month weekday
pub const DEFAULT_REFRESH_CRON: &str = "0 0 9 * * *";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_path: String,
    pub finlife_api_key: Option<String>,
    pub finlife_base_url: String,
    pub parking_source_url: Option<String>,
    pub min_batch_size: usize,
    pub port: u16,
    pub refresh_cron: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            finlife_api_key: None,
            finlife_base_url: FINLIFE_API_BASE.to_string(),
            parking_source_url: None,
            min_batch_size: MIN_BATCH_SIZE,
            port: DEFAULT_PORT,
            refresh_cron: DEFAULT_REFRESH_CRON.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the environment. Call `dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let finlife_api_key = non_empty("FINLIFE_API_KEY");
        if finlife_api_key.is_none() {
            warn!("FINLIFE_API_KEY not set; deposit and savings fetches will return nothing");
        }

        AppConfig {
            catalog_path: non_empty("CATALOG_PATH").unwrap_or(defaults.catalog_path),
            finlife_api_key,
            finlife_base_url: non_empty("FINLIFE_BASE_URL").unwrap_or(defaults.finlife_base_url),
            parking_source_url: non_empty("PARKING_SOURCE_URL"),
            min_batch_size: parsed("MIN_BATCH_SIZE", defaults.min_batch_size),
            port: parsed("PORT", defaults.port),
            refresh_cron: non_empty("REFRESH_CRON").unwrap_or(defaults.refresh_cron),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: FromStr + std::fmt::Display + Copy>(key: &str, default: T) -> T {
    match non_empty(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("${} = {:?} is not valid, defaulting to {}", key, raw, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test touches the process environment so runs don't race each other.
    #[test]
    fn reads_and_defaults_from_env() {
        env::set_var("CATALOG_PATH", "/tmp/rates.json");
        env::set_var("MIN_BATCH_SIZE", "25");
        env::set_var("PORT", "not-a-port");
        env::remove_var("PARKING_SOURCE_URL");
        env::set_var("FINLIFE_API_KEY", "  ");

        let cfg = AppConfig::from_env();
        assert_eq!(cfg.catalog_path, "/tmp/rates.json");
        assert_eq!(cfg.min_batch_size, 25);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert!(cfg.parking_source_url.is_none());
        assert!(cfg.finlife_api_key.is_none());

        for key in ["CATALOG_PATH", "MIN_BATCH_SIZE", "PORT", "FINLIFE_API_KEY"] {
            env::remove_var(key);
        }
    }
}
