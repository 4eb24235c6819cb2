// src/services/finlife.rs
use log::{debug, error, info, warn};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{lenient_rate, Category, FetchedProduct, RateOption};
use crate::BoxError;

pub const FINLIFE_API_BASE: &str = "https://finlife.fss.or.kr/finlifeapi";

/// Financial company groups queried: commercial banks, then savings banks.
pub const FIN_GROUPS: [&str; 2] = ["020000", "030300"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the FSS financial product comparison API.
pub struct FinlifeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

fn endpoint(category: &Category) -> Option<&'static str> {
    match category {
        Category::Deposit => Some("depositProductsSearch.json"),
        Category::Savings => Some("savingProductsSearch.json"),
        _ => None,
    }
}

impl FinlifeClient {
    pub fn new(api_key: String) -> Result<Self, BoxError> {
        Self::with_base_url(api_key, FINLIFE_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, BoxError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn supports(category: &Category) -> bool {
        endpoint(category).is_some()
    }

    /// Fetches every product of `category` across all company groups.
    ///
    /// A group that fails is logged and skipped; the products it would have
    /// returned are simply absent from this batch.
    pub async fn fetch_products(&self, category: &Category) -> Result<Vec<FetchedProduct>, BoxError> {
        let path = endpoint(category)
            .ok_or_else(|| format!("finlife has no endpoint for category '{}'", category))?;

        let mut products = Vec::new();
        for group in FIN_GROUPS {
            match self.fetch_group(path, group).await {
                Ok((bases, options)) => {
                    let mut parsed = assemble_products(&bases, &options, category);
                    info!("finlife {} group {}: {} products", category, group, parsed.len());
                    products.append(&mut parsed);
                }
                Err(e) => {
                    error!("finlife {} group {} failed: {}", category, group, e);
                }
            }
        }
        Ok(products)
    }

    /// Walks all pages of one company group, collecting base and option rows.
    async fn fetch_group(&self, path: &str, group: &str) -> Result<(Vec<Value>, Vec<Value>), BoxError> {
        let mut bases = Vec::new();
        let mut options = Vec::new();
        let mut page: u64 = 1;

        loop {
            let result = self.fetch_page(path, group, page).await?;

            if let Some(rows) = result["baseList"].as_array() {
                bases.extend(rows.iter().cloned());
            }
            if let Some(rows) = result["optionList"].as_array() {
                options.extend(rows.iter().cloned());
            }

            let max_page = lenient_u64(&result["max_page_no"]).unwrap_or(1);
            debug!("finlife {} group {} page {}/{}", path, group, page, max_page);
            if page >= max_page {
                break;
            }
            page += 1;
        }

        Ok((bases, options))
    }

    async fn fetch_page(&self, path: &str, group: &str, page: u64) -> Result<Value, BoxError> {
        let url = format!("{}/{}", self.base_url, path);
        let page_no = page.to_string();

        let body: Value = self.client
            .get(&url)
            .query(&[
                ("auth", self.api_key.as_str()),
                ("topFinGrpNo", group),
                ("pageNo", page_no.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let result = body.get("result").ok_or("response has no 'result' object")?;
        match result["err_cd"].as_str() {
            Some("000") | None => Ok(result.clone()),
            Some(code) => {
                let msg = result["err_msg"].as_str().unwrap_or("unknown error");
                Err(format!("finlife error {}: {}", code, msg).into())
            }
        }
    }
}

/// Numbers arrive as JSON numbers or strings depending on the field.
fn lenient_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|x| x.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_option(row: &Value) -> Option<(String, RateOption)> {
    let id = text(row, "fin_prdt_cd")?;
    let term_months = u32::try_from(lenient_u64(&row["save_trm"])?).ok()?;
    let top_rate = lenient_rate(&row["intr_rate2"])?;
    // basic rate is null for some products; the top rate stands in
    let base_rate = lenient_rate(&row["intr_rate"]).unwrap_or(top_rate);
    Some((id, RateOption { term_months, base_rate, top_rate }))
}

/// Joins base rows with their option rows. Rows missing a required field are
/// dropped individually.
pub fn assemble_products(bases: &[Value], options: &[Value], category: &Category) -> Vec<FetchedProduct> {
    let mut products: Vec<FetchedProduct> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in bases {
        let (id, bank, name) = match (text(row, "fin_prdt_cd"), text(row, "kor_co_nm"), text(row, "fin_prdt_nm")) {
            (Some(id), Some(bank), Some(name)) => (id, bank, name),
            _ => {
                warn!("Dropping finlife base row with missing fields: {}", row);
                continue;
            }
        };
        if index.contains_key(&id) {
            continue;
        }
        index.insert(id.clone(), products.len());
        products.push(FetchedProduct {
            id,
            bank,
            name,
            category: category.clone(),
            term_options: Vec::new(),
        });
    }

    for row in options {
        match parse_option(row) {
            Some((id, opt)) => match index.get(&id) {
                Some(&pos) => products[pos].term_options.push(opt),
                None => debug!("Option for unknown product {}", id),
            },
            None => warn!("Dropping finlife option row with missing fields: {}", row),
        }
    }

    products
}
