//! Combined dataset rebuild
//!
//! A full rebuild from the per-query files: IDs are assigned in file-name
//! order and then record order, so the same inputs always produce the same
//! dataset.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::domain::category::category_for;
use crate::domain::services::{collapse_whitespace, strip_invisible};
use crate::domain::{CombinedDatasetEntry, NormalizedProductRecord};
use crate::error::HarvestResult;
use crate::infrastructure::sites::Site;
use crate::infrastructure::storage::{CombinedPaths, ProductStore, read_query_file};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationReport {
    pub site: Site,
    pub files_read: usize,
    /// Per-query files that couldn't be read and were left out
    pub files_skipped: Vec<PathBuf>,
    pub entries: usize,
    /// Records dropped for an empty name
    pub records_skipped: usize,
    pub paths: CombinedPaths,
}

/// Rebuild `<site>_combined.json` and `.csv` under `output_dir`.
pub fn rebuild(output_dir: &Path, site: Site) -> HarvestResult<AggregationReport> {
    let store = ProductStore::new(output_dir);
    let profile = site.profile();
    let prefix = format!("{}_", site.as_str());

    let mut entries = Vec::new();
    let mut files_read = 0;
    let mut files_skipped = Vec::new();
    let mut records_skipped = 0;

    for path in store.per_query_files(site)? {
        let records = match read_query_file(&path) {
            Ok(records) => records,
            Err(e) => {
                warn!("⚠️ Skipping unreadable per-query file: {}", e);
                files_skipped.push(path);
                continue;
            }
        };
        files_read += 1;

        let subtype = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| stem.strip_prefix(&prefix).unwrap_or(stem).to_string())
            .unwrap_or_default();
        let category = category_for(&subtype);
        if category.is_empty() {
            debug!("No category mapped for subtype '{}'", subtype);
        }

        for record in records {
            let counter = entries.len() + 1;
            match combined_entry(record, profile.id_prefix, counter, category, &subtype) {
                Some(entry) => entries.push(entry),
                None => records_skipped += 1,
            }
        }
    }

    let paths = store.write_combined(site, &entries)?;
    info!(
        "🧩 Combined {} products from {} files → {}",
        entries.len(),
        files_read,
        paths.json.display()
    );

    Ok(AggregationReport {
        site,
        files_read,
        files_skipped,
        entries: entries.len(),
        records_skipped,
        paths,
    })
}

fn clean(text: &str) -> String {
    collapse_whitespace(&strip_invisible(text))
}

fn combined_entry(
    record: NormalizedProductRecord,
    id_prefix: &str,
    counter: usize,
    category: &str,
    subtype: &str,
) -> Option<CombinedDatasetEntry> {
    let name = clean(&record.name);
    if name.is_empty() {
        return None;
    }

    Some(CombinedDatasetEntry {
        id: CombinedDatasetEntry::format_id(id_prefix, counter),
        name,
        dimension: record.dimensions.map(|d| clean(&d)).filter(|d| !d.is_empty()),
        price: record.price,
        rating: record.rating,
        category: category.to_string(),
        subcategory: subtype.to_string(),
        product_url: strip_invisible(&record.url),
        image_url: record.image_url.map(|u| strip_invisible(&u)).filter(|u| !u.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> NormalizedProductRecord {
        NormalizedProductRecord {
            id: "B0DESK0001".into(),
            name: name.into(),
            url: "\u{200E}https://www.amazon.in/dp/B0DESK0001".into(),
            rating: None,
            image_url: Some(" ".into()),
            dimensions: Some("\u{200F}60 x  120 cm".into()),
            price: Some(4999),
        }
    }

    #[test]
    fn entry_fields_are_cleaned() {
        let entry = combined_entry(record("Oak\u{200E} Desk"), "A", 7, "Table", "study_table").unwrap();
        assert_eq!(entry.id, "A-0007");
        assert_eq!(entry.name, "Oak Desk");
        assert_eq!(entry.dimension.as_deref(), Some("60 x 120 cm"));
        assert_eq!(entry.product_url, "https://www.amazon.in/dp/B0DESK0001");
        assert!(entry.image_url.is_none());
        assert_eq!(entry.category, "Table");
    }

    #[test]
    fn invisible_only_name_is_skipped() {
        assert!(combined_entry(record("\u{200E}\u{202C}"), "A", 1, "", "x").is_none());
    }
}
