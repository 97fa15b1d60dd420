//! File-backed product stores
//!
//! Per-query files: `<output_dir>/<site>_<query slug>.json`, an array of
//! normalized records. Combined dataset: `<site>_combined.json` plus the
//! `<site>_combined.csv` projection with the same columns.
//!
//! Cleanup passes work on the combined files generically (JSON objects and
//! a header + rows CSV table) so that columns this crate doesn't know about
//! survive a pass untouched.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::category::query_slug;
use crate::domain::{CombinedDatasetEntry, NormalizedProductRecord};
use crate::error::{HarvestError, HarvestResult};
use crate::infrastructure::atomic_file::AtomicFileUpdate;
use crate::infrastructure::sites::Site;

/// File name marker of the combined dataset
pub const COMBINED_MARKER: &str = "combined";

pub type JsonObject = Map<String, Value>;

/// Paths of the combined dataset for one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProductStore {
    output_dir: PathBuf,
}

impl ProductStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn query_file(&self, site: Site, query: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{}.json", site.as_str(), query_slug(query)))
    }

    pub fn combined_paths(&self, site: Site) -> CombinedPaths {
        CombinedPaths {
            json: self.output_dir.join(format!("{}_{COMBINED_MARKER}.json", site.as_str())),
            csv: self.output_dir.join(format!("{}_{COMBINED_MARKER}.csv", site.as_str())),
        }
    }

    /// Overwrite the per-query file for `query`.
    pub fn save_query_records(
        &self,
        site: Site,
        query: &str,
        records: &[NormalizedProductRecord],
    ) -> HarvestResult<PathBuf> {
        let path = self.query_file(site, query);
        let json = serde_json::to_vec_pretty(records).map_err(|e| HarvestError::json(&path, e))?;
        AtomicFileUpdate::without_backup(&path).write(&json)?;
        info!("💾 Saved {} products → {}", records.len(), path.display());
        Ok(path)
    }

    /// Per-query files of a site in file-name order, combined files excluded.
    pub fn per_query_files(&self, site: Site) -> HarvestResult<Vec<PathBuf>> {
        if !self.output_dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", site.as_str());
        let entries = fs::read_dir(&self.output_dir).map_err(|e| HarvestError::io(&self.output_dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| HarvestError::io(&self.output_dir, e))?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(&prefix)
                && name.ends_with(".json")
                && !name.contains(COMBINED_MARKER)
                && path.is_file()
            {
                files.push(path);
            }
        }
        files.sort();
        debug!("Found {} per-query files for {}", files.len(), site);
        Ok(files)
    }

    /// Write both combined projections; the CSV is written after the JSON.
    pub fn write_combined(&self, site: Site, entries: &[CombinedDatasetEntry]) -> HarvestResult<CombinedPaths> {
        let paths = self.combined_paths(site);

        let json = serde_json::to_vec_pretty(entries).map_err(|e| HarvestError::json(&paths.json, e))?;
        AtomicFileUpdate::without_backup(&paths.json).write(&json)?;

        let csv = combined_csv_bytes(entries).map_err(|e| HarvestError::csv(&paths.csv, e))?;
        AtomicFileUpdate::without_backup(&paths.csv).write(&csv)?;

        Ok(paths)
    }
}

pub fn read_query_file(path: &Path) -> HarvestResult<Vec<NormalizedProductRecord>> {
    let content = fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| HarvestError::json(path, e))
}

pub fn read_combined_entries(path: &Path) -> HarvestResult<Vec<CombinedDatasetEntry>> {
    let content = fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| HarvestError::json(path, e))
}

fn combined_csv_bytes(entries: &[CombinedDatasetEntry]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if entries.is_empty() {
        writer.write_record(CombinedDatasetEntry::COLUMNS)?;
    }
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Array of JSON objects; anything that isn't an object is rejected.
pub fn read_json_objects(path: &Path) -> HarvestResult<Vec<JsonObject>> {
    let content = fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| HarvestError::json(path, e))
}

pub fn json_objects_bytes(path: &Path, objects: &[JsonObject]) -> HarvestResult<Vec<u8>> {
    serde_json::to_vec_pretty(objects).map_err(|e| HarvestError::json(path, e))
}

/// A CSV file as a header row plus string rows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn read(path: &Path) -> HarvestResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| HarvestError::csv(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| HarvestError::csv(path, e))?
            .iter()
            .map(ToString::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| HarvestError::csv(path, e))?;
            let mut row: Vec<String> = record.iter().map(ToString::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Append a column filled with empty values; returns its index.
    pub fn add_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    pub fn remove_column(&mut self, name: &str) -> bool {
        let Some(index) = self.column(name) else {
            return false;
        };
        self.headers.remove(index);
        for row in &mut self.rows {
            if index < row.len() {
                row.remove(index);
            }
        }
        true
    }

    pub fn to_bytes(&self, path: &Path) -> HarvestResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|e| HarvestError::csv(path, e))?;
        for row in &self.rows {
            writer.write_record(row).map_err(|e| HarvestError::csv(path, e))?;
        }
        writer
            .into_inner()
            .map_err(|e| HarvestError::csv(path, csv::Error::from(e.into_error())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, name: &str) -> NormalizedProductRecord {
        NormalizedProductRecord {
            id: id.into(),
            name: name.into(),
            url: format!("https://www.amazon.in/dp/{id}"),
            rating: Some(4.2),
            image_url: None,
            dimensions: None,
            price: Some(1999),
        }
    }

    fn entry(id: &str) -> CombinedDatasetEntry {
        CombinedDatasetEntry {
            id: id.into(),
            name: "Oak Desk".into(),
            dimension: None,
            price: Some(12999),
            rating: None,
            category: "Table".into(),
            subcategory: "study_table".into(),
            product_url: "https://www.amazon.in/dp/B0DESK0001".into(),
            image_url: Some("https://img.example.com/desk.jpg".into()),
        }
    }

    #[test]
    fn per_query_file_is_named_after_the_query_slug() {
        let dir = TempDir::new().unwrap();
        let store = ProductStore::new(dir.path());

        let path = store
            .save_query_records(Site::Amazon, "Study Table", &[record("B0DESK0001", "Oak Desk")])
            .unwrap();
        assert_eq!(path, dir.path().join("amazon_study_table.json"));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"Product Name\": \"Oak Desk\""));
        assert!(raw.contains("\"Dimensions\": \"NA\""));

        let back = read_query_file(&path).unwrap();
        assert_eq!(back[0].name, "Oak Desk");
        assert!(back[0].dimensions.is_none());
    }

    #[test]
    fn query_with_path_characters_stays_in_output_dir() {
        let dir = TempDir::new().unwrap();
        let store = ProductStore::new(dir.path());

        let path = store
            .save_query_records(Site::Amazon, "3/4 bed", &[record("B0BED00001", "Three Quarter Bed")])
            .unwrap();
        assert_eq!(path, dir.path().join("amazon_3_4_bed.json"));
        assert_eq!(store.per_query_files(Site::Amazon).unwrap(), vec![path]);
    }

    #[test]
    fn per_query_listing_is_sorted_and_skips_combined() {
        let dir = TempDir::new().unwrap();
        for name in ["amazon_sofa.json", "amazon_bed.json", "amazon_combined.json", "flipkart_bed.json", "amazon_notes.txt"] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        let store = ProductStore::new(dir.path());

        let names: Vec<_> = store
            .per_query_files(Site::Amazon)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["amazon_bed.json", "amazon_sofa.json"]);

        assert!(ProductStore::new(dir.path().join("missing")).per_query_files(Site::Amazon).unwrap().is_empty());
    }

    #[test]
    fn combined_projections_share_columns() {
        let dir = TempDir::new().unwrap();
        let store = ProductStore::new(dir.path());

        let paths = store.write_combined(Site::Amazon, &[entry("A-0001")]).unwrap();
        let table = CsvTable::read(&paths.csv).unwrap();
        assert_eq!(table.headers, CombinedDatasetEntry::COLUMNS.to_vec());
        assert_eq!(table.rows[0][table.column("Dimension").unwrap()], "NA");
        assert_eq!(table.rows[0][table.column("Rating").unwrap()], "");

        let objects = read_json_objects(&paths.json).unwrap();
        let keys: Vec<_> = objects[0].keys().cloned().collect();
        assert_eq!(keys, CombinedDatasetEntry::COLUMNS.to_vec());
        assert_eq!(objects[0]["Rating"], Value::Null);

        let entries = read_combined_entries(&paths.json).unwrap();
        assert_eq!(entries, vec![entry("A-0001")]);
    }

    #[test]
    fn empty_combined_csv_still_has_headers() {
        let dir = TempDir::new().unwrap();
        let paths = ProductStore::new(dir.path()).write_combined(Site::Flipkart, &[]).unwrap();
        let table = CsvTable::read(&paths.csv).unwrap();
        assert_eq!(table.headers.len(), CombinedDatasetEntry::COLUMNS.len());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn csv_columns_can_be_added_and_removed() {
        let mut table = CsvTable {
            headers: vec!["ID".into(), "Image URL".into()],
            rows: vec![vec!["A-0001".into(), "https://img.example.com/a.jpg".into()]],
        };
        assert_eq!(table.add_column("ImageURL"), 2);
        assert_eq!(table.add_column("ImageURL"), 2);
        assert!(table.remove_column("Image URL"));
        assert!(!table.remove_column("Image URL"));
        assert_eq!(table.headers, vec!["ID", "ImageURL"]);
        assert_eq!(table.rows[0], vec!["A-0001", ""]);
    }
}
