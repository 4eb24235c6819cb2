// src/services/curated.rs
use chrono::NaiveDate;
use csv::Reader;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::Read;

use crate::models::{lenient_rate, round_rate, same_rate, sort_by_top_rate, CatalogEntry, Category, HistoryEntry, ProductRecord};
use crate::services::reconcile::record_rate;
use crate::services::store::CatalogStore;
use crate::BoxError;

/// One row of a curated import file:
/// `id,bank,name,category,baseRate,topRate,termMonths`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratedRow {
    pub id: String,
    pub bank: String,
    pub name: String,
    pub category: Category,
    pub base_rate: f64,
    pub top_rate: f64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub term_months: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

/// Parses curated rows, skipping (and counting) rows that do not parse.
pub fn read_curated_csv<R: Read>(reader: R) -> Result<(Vec<CuratedRow>, usize), BoxError> {
    let mut rdr = Reader::from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0;

    for (i, result) in rdr.deserialize::<CuratedRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!("Skipping curated row {}: {}", i + 2, e);
                skipped += 1;
            }
        }
    }
    Ok((rows, skipped))
}

/// Sets `key` to a rate, leaving it alone when it already holds the same rate
/// (so `3` is not rewritten as `3.0`). Returns whether anything changed.
fn set_rate_field(map: &mut Map<String, Value>, key: &str, rate: f64) -> bool {
    if map.get(key).and_then(lenient_rate).map_or(false, |r| same_rate(r, rate)) {
        return false;
    }
    map.insert(key.to_string(), Value::from(rate));
    true
}

fn set_field(map: &mut Map<String, Value>, key: &str, value: Value) -> bool {
    if map.get(key) == Some(&value) {
        return false;
    }
    map.insert(key.to_string(), value);
    true
}

/// Applies a row to an existing curated entry, touching only the columns the
/// import carries plus `history`. Returns whether the entry changed.
fn update_entry(value: &mut Value, row: CuratedRow, today: NaiveDate) -> Result<bool, BoxError> {
    let map = value.as_object_mut().ok_or("catalog entry is not an object")?;
    let mut history: Vec<HistoryEntry> = match map.get("history") {
        None | Some(Value::Null) => Vec::new(),
        Some(h) => serde_json::from_value(h.clone())?,
    };

    let top_rate = round_rate(row.top_rate);
    let rate_moved = set_rate_field(map, "topRate", top_rate);
    let tail_stale = history.last().map_or(true, |e| !same_rate(e.rate, top_rate));
    let mut touched = rate_moved;
    if rate_moved || tail_stale {
        touched |= record_rate(&mut history, today, top_rate);
        map.insert("history".to_string(), serde_json::to_value(&history)?);
    }

    let term_months = row.term_months.unwrap_or(0);
    let term_same = map.get("termMonths").and_then(Value::as_u64) == Some(u64::from(term_months));
    if !term_same {
        map.insert("termMonths".to_string(), Value::from(term_months));
    }

    touched |= !term_same;
    touched |= set_rate_field(map, "baseRate", round_rate(row.base_rate));
    touched |= set_field(map, "bank", Value::from(row.bank));
    touched |= set_field(map, "name", Value::from(row.name));
    touched |= set_field(map, "category", Value::from(row.category.as_str()));
    Ok(touched)
}

/// Upserts curated rows into the catalog. Managed categories and ids owned by
/// managed products are refused: that data comes only from the fetch.
pub fn merge_curated(catalog: &mut Vec<CatalogEntry>, rows: Vec<CuratedRow>, today: NaiveDate) -> ImportReport {
    let mut report = ImportReport::default();

    for row in rows {
        if row.category.is_managed() {
            warn!("Refusing curated row {}: '{}' is a fetched category", row.id, row.category);
            report.skipped += 1;
            continue;
        }

        match catalog.iter_mut().find(|e| e.id().as_deref() == Some(row.id.as_str())) {
            Some(existing) if existing.is_managed() => {
                warn!("Refusing curated row {}: id belongs to a fetched product", row.id);
                report.skipped += 1;
            }
            Some(CatalogEntry::Preserved(value)) => {
                let id = row.id.clone();
                match update_entry(value, row, today) {
                    Ok(true) => report.updated += 1,
                    Ok(false) => report.unchanged += 1,
                    Err(e) => {
                        warn!("Refusing curated row {}: existing entry cannot be updated ({})", id, e);
                        report.skipped += 1;
                    }
                }
            }
            Some(CatalogEntry::Managed(p)) => {
                warn!("Refusing curated row {}: id belongs to typed product {}", row.id, p.name);
                report.skipped += 1;
            }
            None => {
                let top_rate = round_rate(row.top_rate);
                let record = ProductRecord {
                    id: row.id,
                    bank: row.bank,
                    name: row.name,
                    category: row.category,
                    base_rate: round_rate(row.base_rate),
                    top_rate,
                    term_months: row.term_months.unwrap_or(0),
                    rate_options: None,
                    history: vec![HistoryEntry { date: today, rate: top_rate }],
                    extra: Map::new(),
                };
                match serde_json::to_value(&record) {
                    Ok(value) => {
                        catalog.push(CatalogEntry::Preserved(value));
                        report.added += 1;
                    }
                    Err(e) => {
                        warn!("Refusing curated row {}: {}", record.id, e);
                        report.skipped += 1;
                    }
                }
            }
        }
    }

    report
}

/// Imports a curated CSV file into the catalog, saving only when rows were
/// added or changed.
pub fn import_curated_file(store: &CatalogStore, csv_path: &str, today: NaiveDate) -> Result<ImportReport, BoxError> {
    let file = std::fs::File::open(csv_path)?;
    let (rows, skipped) = read_curated_csv(file)?;
    info!("Read {} curated rows from {}", rows.len(), csv_path);

    let mut catalog = store.load()?;
    let mut report = merge_curated(&mut catalog, rows, today);
    report.skipped += skipped;

    if report.added > 0 || report.updated > 0 {
        sort_by_top_rate(&mut catalog);
        store.save(&catalog)?;
    }
    info!("Curated import: {:?}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    const CSV: &str = "\
id,bank,name,category,baseRate,topRate,termMonths
C001,Some Securities,CMA RP,cma,3.1,3.1,
B001,Some Securities,Corp bond 24-1,bond,4.2,4.2,24
D001,Bank,Sneaky deposit,deposit,3.0,3.5,12
X001,Bank,Bad rate,els,abc,6.0,36
";

    #[test]
    fn reads_rows_and_counts_bad_ones() {
        let (rows, skipped) = read_curated_csv(CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(skipped, 1);
        assert_eq!(rows[0].term_months, None);
        assert_eq!(rows[1].category, Category::Bond);
    }

    fn history_len(entry: &CatalogEntry) -> usize {
        match entry {
            CatalogEntry::Preserved(v) => v["history"].as_array().map_or(0, Vec::len),
            CatalogEntry::Managed(p) => p.history.len(),
        }
    }

    #[test]
    fn merges_and_refuses_managed() {
        let (rows, _) = read_curated_csv(CSV.as_bytes()).unwrap();
        let mut catalog = Vec::new();
        let report = merge_curated(&mut catalog, rows.clone(), day("2024-01-01"));

        assert_eq!(report, ImportReport { added: 2, updated: 0, unchanged: 0, skipped: 1 });
        assert!(catalog.iter().all(|e| !e.is_managed()));
        let CatalogEntry::Preserved(c001) = &catalog[0] else { panic!("curated rows stay raw") };
        assert_eq!(c001["termMonths"], json!(0));

        let again = merge_curated(&mut catalog, rows, day("2024-01-02"));
        assert_eq!(again.unchanged, 2);
        assert_eq!(history_len(&catalog[0]), 1);
    }

    #[test]
    fn rate_change_updates_history() {
        let (rows, _) = read_curated_csv(CSV.as_bytes()).unwrap();
        let mut catalog = Vec::new();
        merge_curated(&mut catalog, rows[..1].to_vec(), day("2024-01-01"));

        let mut changed = rows[0].clone();
        changed.top_rate = 3.3;
        let report = merge_curated(&mut catalog, vec![changed], day("2024-02-01"));

        assert_eq!(report.updated, 1);
        let CatalogEntry::Preserved(v) = &catalog[0] else { panic!("curated rows stay raw") };
        assert_eq!(v["history"][0]["rate"], json!(3.1));
        assert_eq!(v["history"][1]["rate"], json!(3.3));
    }

    #[test]
    fn update_keeps_fields_the_import_does_not_carry() {
        let mut catalog = vec![CatalogEntry::Preserved(json!({
            "id": "C001", "bank": "Some Securities", "name": "CMA RP", "category": "cma",
            "baseRate": 3.1, "topRate": 3.1, "termMonths": 0,
            "link": "https://example.com/cma"
        }))];
        let (rows, _) = read_curated_csv(CSV.as_bytes()).unwrap();

        let report = merge_curated(&mut catalog, rows[..1].to_vec(), day("2024-01-01"));
        assert_eq!(report.updated, 1, "history was seeded");

        let CatalogEntry::Preserved(v) = &catalog[0] else { panic!("curated rows stay raw") };
        assert_eq!(v["link"], json!("https://example.com/cma"));
        assert_eq!(v["history"], json!([{"date": "2024-01-01", "rate": 3.1}]));
    }
}
