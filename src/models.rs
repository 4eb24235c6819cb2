// src/models.rs
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use chrono::NaiveDate;
use std::fmt;

/// Rates are compared and stored at this many decimal places.
pub const RATE_DECIMALS: i32 = 2;

/// Rounds a rate to `RATE_DECIMALS` places. Provider rates such as 3.4999999
/// and 3.5 are the same offer; every equality check on rates goes through here.
pub fn round_rate(rate: f64) -> f64 {
    let factor = 10f64.powi(RATE_DECIMALS);
    (rate * factor).round() / factor
}

pub fn same_rate(a: f64, b: f64) -> bool {
    round_rate(a) == round_rate(b)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Deposit,
    Savings,
    Parking,
    Cma,
    Bill,
    Els,
    Bond,
    /// Unknown kinds are kept verbatim and never touched by the fetch.
    Other(String),
}

impl Category {
    /// Categories refreshed by the automated fetch, in fetch order.
    pub const MANAGED: [Category; 3] = [Category::Deposit, Category::Savings, Category::Parking];

    pub fn is_managed(&self) -> bool {
        matches!(self, Category::Deposit | Category::Savings | Category::Parking)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Deposit => "deposit",
            Category::Savings => "savings",
            Category::Parking => "parking",
            Category::Cma => "cma",
            Category::Bill => "bill",
            Category::Els => "els",
            Category::Bond => "bond",
            Category::Other(s) => s,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.as_str() {
            "deposit" => Category::Deposit,
            "savings" => Category::Savings,
            "parking" => Category::Parking,
            "cma" => Category::Cma,
            "bill" => Category::Bill,
            "els" => Category::Els,
            "bond" => Category::Bond,
            _ => Category::Other(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateOption {
    pub term_months: u32,
    pub base_rate: f64,
    pub top_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub rate: f64,
}

/// One rate offer as persisted in the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    pub bank: String,
    pub name: String,
    pub category: Category,
    pub base_rate: f64,
    pub top_rate: f64,
    // older catalogs omit this on curated entries
    #[serde(default)]
    pub term_months: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_options: Option<Vec<RateOption>>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Fields this crate does not model (links, memos on curated entries).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reads a rate the way hand-edited files write it: a number or a numeric string.
pub fn lenient_rate(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One element of the catalog file.
///
/// Only managed products are typed. Everything else (curated entries, and
/// managed entries that no longer fit `ProductRecord`) is held as the JSON it
/// was read as and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Managed(ProductRecord),
    Preserved(Value),
}

impl CatalogEntry {
    /// String ids as-is; numeric ids (older hand-kept files) as their decimal text.
    pub fn id(&self) -> Option<String> {
        match self {
            CatalogEntry::Managed(p) => Some(p.id.clone()),
            CatalogEntry::Preserved(v) => match v.get("id")? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            },
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            CatalogEntry::Managed(p) => Some(p.category.clone()),
            CatalogEntry::Preserved(v) => v
                .get("category")
                .and_then(Value::as_str)
                .map(|c| Category::from(c.to_string())),
        }
    }

    /// True for anything claiming a managed category, typed or not.
    pub fn is_managed(&self) -> bool {
        self.category().map_or(false, |c| c.is_managed())
    }

    pub fn top_rate(&self) -> Option<f64> {
        match self {
            CatalogEntry::Managed(p) => Some(p.top_rate),
            CatalogEntry::Preserved(v) => v.get("topRate").and_then(lenient_rate),
        }
    }

    pub fn as_managed(&self) -> Option<&ProductRecord> {
        match self {
            CatalogEntry::Managed(p) => Some(p),
            CatalogEntry::Preserved(_) => None,
        }
    }
}

/// Orders a catalog by descending top rate. Entries without a readable rate go
/// last; ties keep their current order.
pub fn sort_by_top_rate(catalog: &mut [CatalogEntry]) {
    let key = |e: &CatalogEntry| e.top_rate().unwrap_or(f64::NEG_INFINITY);
    catalog.sort_by(|a, b| key(b).total_cmp(&key(a)));
}

/// A product as returned by a fetcher, before term selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedProduct {
    pub id: String,
    pub bank: String,
    pub name: String,
    pub category: Category,
    pub term_options: Vec<RateOption>,
}

/// A fetched product reduced to its representative rate; the reconciler's input.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub bank: String,
    pub name: String,
    pub category: Category,
    pub base_rate: f64,
    pub top_rate: f64,
    pub term_months: u32,
    pub rate_options: Option<Vec<RateOption>>,
}
