// src/services/store.rs
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::{CatalogEntry, Category, ProductRecord};
use crate::BoxError;

/// The catalog file: a JSON array of product records, rewritten whole on
/// every commit.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalog.
    ///
    /// A missing file is an empty catalog. An unparseable file is also
    /// treated as empty (after copying it aside to `<file>.malformed`), so the
    /// next committed run rebuilds the managed set but loses any curated
    /// records that were in it. Within a readable file, nothing is dropped:
    /// see [`classify`].
    pub fn load(&self) -> Result<Vec<CatalogEntry>, BoxError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No catalog at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let raw: Vec<Value> = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Catalog {} is malformed ({}); treating it as empty", self.path.display(), e);
                let backup = self.sibling("malformed");
                if let Err(e) = fs::copy(&self.path, &backup) {
                    error!("Could not back up malformed catalog to {}: {}", backup.display(), e);
                } else {
                    warn!("Malformed catalog copied to {}", backup.display());
                }
                return Ok(Vec::new());
            }
        };

        let entries: Vec<CatalogEntry> = raw.into_iter().enumerate().map(|(i, v)| classify(i, v)).collect();
        info!("Loaded {} products from {}", entries.len(), self.path.display());
        Ok(entries)
    }

    /// Replaces the catalog file. The new content is written next to it first
    /// and renamed over it, so readers never see a half-written file.
    pub fn save(&self, records: &[CatalogEntry]) -> Result<(), BoxError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        records.serialize(&mut ser)?;
        buf.push(b'\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.sibling("tmp");
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, &self.path)?;
        info!("Saved {} products to {}", records.len(), self.path.display());
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}

/// Types an entry only when its category is managed and it fits
/// `ProductRecord`. Curated entries stay raw apart from a `termMonths: 0` fill;
/// managed entries that do not fit are kept raw and untouched.
pub fn classify(index: usize, mut value: Value) -> CatalogEntry {
    let managed = value
        .get("category")
        .and_then(Value::as_str)
        .map_or(false, |c| Category::from(c.to_string()).is_managed());

    if managed {
        return match serde_json::from_value::<ProductRecord>(value.clone()) {
            Ok(record) => CatalogEntry::Managed(record),
            Err(e) => {
                warn!("Catalog entry #{} does not fit the product schema ({}); keeping it as is", index, e);
                CatalogEntry::Preserved(value)
            }
        };
    }

    match value.as_object_mut() {
        Some(map) => {
            if !map.contains_key("termMonths") {
                map.insert("termMonths".to_string(), Value::from(0));
            }
        }
        None => warn!("Catalog entry #{} is not an object; keeping it as is", index),
    }
    CatalogEntry::Preserved(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("data.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_empty_and_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{ not json").unwrap();

        let store = CatalogStore::new(&path);
        assert!(store.load().unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("data.json.malformed")).unwrap(),
            "{ not json"
        );
    }

    #[test]
    fn entries_that_do_not_fit_are_kept_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let broken_managed = json!({"id": "broken", "bank": "B", "category": "deposit"});
        let bond = json!({"id": 3, "bank": "S", "category": "bond", "topRate": 4.2});
        let content = json!([
            {"id": "A001", "bank": "B", "name": "N", "category": "deposit",
             "baseRate": 3.0, "topRate": 3.5, "termMonths": 12,
             "history": [{"date": "2024-01-01", "rate": 3.5}]},
            broken_managed.clone(),
            bond.clone(),
        ]);
        fs::write(&path, content.to_string()).unwrap();

        let entries = CatalogStore::new(&path).load().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].as_managed().map(|p| p.term_months), Some(12));
        assert_eq!(entries[1], CatalogEntry::Preserved(broken_managed));

        let mut filled = bond;
        filled["termMonths"] = json!(0);
        assert_eq!(entries[2], CatalogEntry::Preserved(filled));
    }

    #[test]
    fn save_round_trips_both_kinds_of_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let store = CatalogStore::new(&path);

        let record: ProductRecord = serde_json::from_value(json!({
            "id": "D001", "bank": "은행", "name": "정기예금", "category": "deposit",
            "baseRate": 3.1, "topRate": 3.4, "termMonths": 12,
            "history": [{"date": "2024-01-01", "rate": 3.4}]
        }))
        .unwrap();
        let cma = json!({
            "id": "C001", "bank": "증권사", "name": "CMA", "category": "cma",
            "baseRate": 3, "topRate": 3, "termMonths": 0,
            "memo": "우대조건 없음"
        });
        let entries = vec![CatalogEntry::Managed(record), CatalogEntry::Preserved(cma)];

        store.save(&entries).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("    {"), "four-space indentation");
        assert!(text.contains("증권사"), "non-ASCII is written as-is");
        assert!(text.contains("\"topRate\": 3,"), "integer rates stay integers");
        assert!(!text.contains("\"history\": []"));
        assert!(!dir.path().join("nested").join("data.json.tmp").exists());

        assert_eq!(store.load().unwrap(), entries);
    }
}
