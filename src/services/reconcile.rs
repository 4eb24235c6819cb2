// src/services/reconcile.rs
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_json::Map;
use std::collections::{HashMap, HashSet};

use crate::models::{round_rate, same_rate, sort_by_top_rate, Candidate, CatalogEntry, HistoryEntry, ProductRecord};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    pub created: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub carried_forward: usize,
    pub dropped: usize,
}

#[derive(Debug)]
pub struct Reconciled {
    pub catalog: Vec<CatalogEntry>,
    pub report: ReconcileReport,
}

/// Records `rate` as the product's rate on `today`.
///
/// History keeps at most one entry per day and never two consecutive entries
/// with the same rate: an entry already dated today is replaced, and nothing is
/// appended if the remaining tail already carries `rate`. Returns whether the
/// history changed.
pub fn record_rate(history: &mut Vec<HistoryEntry>, today: NaiveDate, rate: f64) -> bool {
    let rate = round_rate(rate);
    if history.last().map_or(false, |e| e.date == today && same_rate(e.rate, rate)) {
        return false;
    }

    let before = history.len();
    history.retain(|e| e.date != today);
    let stripped = history.len() != before;

    if history.last().map_or(false, |e| same_rate(e.rate, rate)) {
        return stripped;
    }
    history.push(HistoryEntry { date: today, rate });
    true
}

fn new_product(candidate: Candidate, today: NaiveDate) -> ProductRecord {
    let top_rate = round_rate(candidate.top_rate);
    ProductRecord {
        id: candidate.id,
        bank: candidate.bank,
        name: candidate.name,
        category: candidate.category,
        base_rate: round_rate(candidate.base_rate),
        top_rate,
        term_months: candidate.term_months,
        rate_options: candidate.rate_options,
        history: vec![HistoryEntry { date: today, rate: top_rate }],
        extra: Map::new(),
    }
}

/// Applies a candidate to an existing managed product. Returns true when the
/// rate moved.
fn apply(existing: &mut ProductRecord, candidate: Candidate, today: NaiveDate) -> bool {
    let top_rate = round_rate(candidate.top_rate);
    let rate_moved = !same_rate(existing.top_rate, top_rate);
    let tail_stale = existing
        .history
        .last()
        .map_or(true, |e| !same_rate(e.rate, top_rate));

    if rate_moved || tail_stale {
        if rate_moved {
            info!(
                "[{}] {} rate change: {}% -> {}%",
                candidate.bank, existing.id, existing.top_rate, top_rate
            );
        }
        record_rate(&mut existing.history, today, top_rate);
    }

    existing.bank = candidate.bank;
    existing.name = candidate.name;
    existing.category = candidate.category;
    existing.base_rate = round_rate(candidate.base_rate);
    existing.top_rate = top_rate;
    existing.term_months = candidate.term_months;
    existing.rate_options = candidate.rate_options;

    rate_moved
}

/// Merges a batch of candidates into the prior catalog.
///
/// Preserved entries (curated records, and managed ones that no longer fit the
/// schema) are passed through untouched. Managed products are matched by id;
/// products missing from the batch are carried forward as they were. The
/// result is ordered by descending top rate.
pub fn reconcile(prior: Vec<CatalogEntry>, batch: Vec<Candidate>, today: NaiveDate) -> Reconciled {
    let mut preserved: Vec<CatalogEntry> = Vec::new();
    let mut prior_managed: Vec<ProductRecord> = Vec::new();
    for entry in prior {
        match entry {
            CatalogEntry::Managed(p) if p.category.is_managed() => prior_managed.push(p),
            other => preserved.push(other),
        }
    }

    let preserved_ids: HashSet<String> = preserved.iter().filter_map(CatalogEntry::id).collect();

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut report = ReconcileReport::default();

    // A hand-edited catalog can repeat an id; the first record wins.
    let mut managed: Vec<ProductRecord> = Vec::with_capacity(prior_managed.len());
    for p in prior_managed {
        if index.contains_key(&p.id) {
            warn!("Duplicate managed id {} in prior catalog, keeping the first", p.id);
            continue;
        }
        index.insert(p.id.clone(), managed.len());
        managed.push(p);
    }

    let mut touched: HashSet<String> = HashSet::new();

    for candidate in batch {
        if !candidate.category.is_managed() {
            warn!("Dropping {}: category '{}' is not fetched", candidate.id, candidate.category);
            report.dropped += 1;
            continue;
        }
        if preserved_ids.contains(&candidate.id) {
            warn!("Dropping {}: id belongs to a preserved record", candidate.id);
            report.dropped += 1;
            continue;
        }

        match index.get(&candidate.id) {
            Some(&pos) => {
                let id = candidate.id.clone();
                let first_touch = touched.insert(id.clone());
                if apply(&mut managed[pos], candidate, today) {
                    if first_touch {
                        report.changed += 1;
                    }
                } else if first_touch {
                    report.unchanged += 1;
                }
                debug!("Matched {}", id);
            }
            None => {
                debug!("New product {} ({})", candidate.id, candidate.name);
                index.insert(candidate.id.clone(), managed.len());
                touched.insert(candidate.id.clone());
                managed.push(new_product(candidate, today));
                report.created += 1;
            }
        }
    }

    report.carried_forward = managed.iter().filter(|p| !touched.contains(&p.id)).count();

    let mut catalog = preserved;
    catalog.extend(managed.into_iter().map(CatalogEntry::Managed));
    sort_by_top_rate(&mut catalog);

    Reconciled { catalog, report }
}
