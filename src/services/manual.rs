// src/services/manual.rs
use chrono::NaiveDate;
use log::{info, warn};
use serde_json::Value;

use crate::models::{lenient_rate, round_rate, same_rate, CatalogEntry, HistoryEntry};
use crate::services::reconcile::record_rate;
use crate::services::store::CatalogStore;
use crate::BoxError;

#[derive(Debug, Clone, PartialEq)]
pub enum ManualUpdate {
    Changed { bank: String, from: Option<f64>, to: f64 },
    /// Rate was already current but the history did not end on it.
    HistoryRepaired,
    Unchanged,
    NotFound,
    /// The entry's history or shape cannot be read; edit the file by hand.
    Unreadable(String),
}

impl ManualUpdate {
    pub fn needs_save(&self) -> bool {
        matches!(self, ManualUpdate::Changed { .. } | ManualUpdate::HistoryRepaired)
    }
}

/// Decides what a manual rate means for a record's history, updating it in
/// place. The caller writes `new_rate` back when the outcome is `Changed`.
fn apply_to_history(
    id: &str,
    bank: &str,
    top_rate: Option<f64>,
    history: &mut Vec<HistoryEntry>,
    new_rate: f64,
    today: NaiveDate,
) -> ManualUpdate {
    let tail_stale = history.last().map_or(true, |e| !same_rate(e.rate, new_rate));

    match top_rate {
        Some(current) if same_rate(current, new_rate) => {
            if tail_stale {
                record_rate(history, today, new_rate);
                info!("[{}] history of {} now ends on {}%", bank, id, new_rate);
                return ManualUpdate::HistoryRepaired;
            }
            info!("[{}] no rate change for {}, keeping the record", bank, id);
            ManualUpdate::Unchanged
        }
        from => {
            let shown = from.map_or_else(|| "unset".to_string(), |r| format!("{}%", r));
            info!("[{}] rate change for {}: {} -> {}%", bank, id, shown, new_rate);
            record_rate(history, today, new_rate);
            ManualUpdate::Changed { bank: bank.to_string(), from, to: new_rate }
        }
    }
}

fn apply_to_value(id: &str, value: &mut Value, new_rate: f64, today: NaiveDate) -> ManualUpdate {
    let map = match value.as_object_mut() {
        Some(map) => map,
        None => return ManualUpdate::Unreadable("entry is not an object".to_string()),
    };
    let mut history: Vec<HistoryEntry> = match map.get("history") {
        None | Some(Value::Null) => Vec::new(),
        Some(h) => match serde_json::from_value(h.clone()) {
            Ok(history) => history,
            Err(e) => return ManualUpdate::Unreadable(format!("history: {}", e)),
        },
    };
    let bank = map.get("bank").and_then(Value::as_str).unwrap_or_default().to_string();
    let top_rate = map.get("topRate").and_then(lenient_rate);

    let outcome = apply_to_history(id, &bank, top_rate, &mut history, new_rate, today);
    if outcome.needs_save() {
        let history = match serde_json::to_value(&history) {
            Ok(h) => h,
            Err(e) => return ManualUpdate::Unreadable(format!("history: {}", e)),
        };
        map.insert("history".to_string(), history);
    }
    if matches!(outcome, ManualUpdate::Changed { .. }) {
        map.insert("topRate".to_string(), Value::from(new_rate));
    }
    outcome
}

/// Sets a product's top rate by hand, recording the change in its history.
/// Only `topRate` and `history` are rewritten; the rest of the entry is left
/// as it is.
pub fn apply_manual_rate(catalog: &mut [CatalogEntry], id: &str, new_rate: f64, today: NaiveDate) -> ManualUpdate {
    let entry = match catalog.iter_mut().find(|e| e.id().as_deref() == Some(id)) {
        Some(e) => e,
        None => return ManualUpdate::NotFound,
    };

    if entry.is_managed() {
        warn!("{} is refreshed by the fetch; the next run may overwrite this rate", id);
    }

    let new_rate = round_rate(new_rate);
    match entry {
        CatalogEntry::Managed(product) => {
            let outcome = apply_to_history(id, &product.bank, Some(product.top_rate), &mut product.history, new_rate, today);
            if matches!(outcome, ManualUpdate::Changed { .. }) {
                product.top_rate = new_rate;
            }
            outcome
        }
        CatalogEntry::Preserved(value) => apply_to_value(id, value, new_rate, today),
    }
}

/// Loads the catalog, applies the rate, and saves only when something changed.
pub fn update_product_rate(store: &CatalogStore, id: &str, new_rate: f64, today: NaiveDate) -> Result<ManualUpdate, BoxError> {
    let mut catalog = store.load()?;
    let outcome = apply_manual_rate(&mut catalog, id, new_rate, today);
    if outcome.needs_save() {
        store.save(&catalog)?;
    } else {
        info!("No changes, catalog file left as is");
    }
    Ok(outcome)
}
