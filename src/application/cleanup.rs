//! Backup-guarded cleanup passes over the combined dataset
//!
//! A pass edits the JSON objects and the CSV table in memory and reports how
//! many values it changed. `CleanupRunner` writes a file only when its pass
//! changed something, so a converged store is never rewritten and a second
//! run leaves both files byte-identical. Every write goes through
//! `AtomicFileUpdate`, which keeps a timestamped backup of the old file.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{HarvestError, HarvestResult};
use crate::infrastructure::atomic_file::AtomicFileUpdate;
use crate::infrastructure::sites::Site;
use crate::infrastructure::storage::{
    CombinedPaths, CsvTable, JsonObject, ProductStore, json_objects_bytes, read_json_objects,
};

const ID_KEY: &str = "ID";
const PRODUCT_URL_KEY: &str = "ProductURL";
const IMAGE_URL_KEY: &str = "ImageURL";
const LEGACY_IMAGE_URL_KEY: &str = "Image URL";

/// Columns every combined row must carry after a pass
const REQUIRED_COLUMNS: [&str; 3] = [ID_KEY, "Name", PRODUCT_URL_KEY];

/// Id keys found in per-query files of various ages
const SOURCE_ID_KEYS: [&str; 4] = ["Product ID", "ProductID", "product_id", "asin"];
const SOURCE_URL_KEYS: [&str; 4] = ["Product URL", "ProductURL", "product_url", "ProductUrl"];
const SOURCE_IMAGE_KEYS: [&str; 4] = ["Image URL", "ImageURL", "image_url", "image"];

const DIMENSION_KEYS: [&str; 2] = ["Dimensions", "Dimension"];

/// Shortest path segment accepted as a product id
const MIN_URL_ID_LEN: usize = 5;

/// A transformation of the combined store. Both methods return the number
/// of changes made; zero means the projection is already converged.
pub trait CleanupPass {
    fn name(&self) -> &'static str;

    fn apply_json(&self, objects: &mut [JsonObject]) -> usize;

    fn apply_csv(&self, table: &mut CsvTable) -> usize;
}

/// Passes selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CleanupKind {
    BackfillImages,
    ConsolidateImageKeys,
    StripWeight,
}

impl fmt::Display for CleanupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BackfillImages => "backfill-images",
            Self::ConsolidateImageKeys => "consolidate-image-keys",
            Self::StripWeight => "strip-weight",
        })
    }
}

impl CleanupKind {
    /// Instantiate the pass; `backfill-images` reads the per-query files.
    pub fn build(self, store: &ProductStore, site: Site) -> HarvestResult<Box<dyn CleanupPass>> {
        Ok(match self {
            Self::BackfillImages => Box::new(BackfillImages::from_store(store, site)?),
            Self::ConsolidateImageKeys => Box::new(ConsolidateImageKeys),
            Self::StripWeight => Box::new(StripWeight),
        })
    }
}

fn non_empty_str(object: &JsonObject, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "NA")
        .map(ToString::to_string)
}

fn is_blank(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "NA"
}

/// Product id from a product URL: the ASIN after `/dp/`, otherwise the last
/// path segment.
pub fn id_from_product_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);

    if let Some(start) = path.find("/dp/") {
        let id = path[start + 4..].split('/').next().unwrap_or_default();
        return (!id.is_empty()).then(|| id.to_string());
    }

    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| segment.len() >= MIN_URL_ID_LEN && !segment.contains(':'))
        .map(ToString::to_string)
}

/// Fill `ImageURL` from the per-query files, matching on product id.
#[derive(Debug, Clone, Default)]
pub struct BackfillImages {
    images: HashMap<String, String>,
}

impl BackfillImages {
    pub fn from_store(store: &ProductStore, site: Site) -> HarvestResult<Self> {
        let mut pass = Self::default();
        for path in store.per_query_files(site)? {
            match read_json_objects(&path) {
                Ok(objects) => pass.index(&objects),
                Err(e) => warn!("⚠️ Not using {} for image backfill: {}", path.display(), e),
            }
        }
        info!("🖼️ Indexed {} product images from per-query files", pass.images.len());
        Ok(pass)
    }

    /// Record the first image seen for each id. A record is indexed under
    /// its explicit id and under the id in its URL.
    pub fn index(&mut self, objects: &[JsonObject]) {
        for object in objects {
            let Some(image) = SOURCE_IMAGE_KEYS.iter().find_map(|key| non_empty_str(object, key)) else {
                continue;
            };
            let explicit = SOURCE_ID_KEYS.iter().find_map(|key| non_empty_str(object, key));
            let from_url = SOURCE_URL_KEYS
                .iter()
                .find_map(|key| non_empty_str(object, key))
                .and_then(|url| id_from_product_url(&url));

            for id in explicit.into_iter().chain(from_url) {
                self.images.entry(id).or_insert_with(|| image.clone());
            }
        }
    }

    fn image_for(&self, product_url: &str) -> Option<&String> {
        id_from_product_url(product_url).and_then(|id| self.images.get(&id))
    }
}

impl CleanupPass for BackfillImages {
    fn name(&self) -> &'static str {
        "backfill-images"
    }

    fn apply_json(&self, objects: &mut [JsonObject]) -> usize {
        let mut changed = 0;
        for object in objects.iter_mut() {
            let Some(url) = non_empty_str(object, PRODUCT_URL_KEY) else {
                continue;
            };
            let Some(image) = self.image_for(&url) else {
                continue;
            };
            if object.get(IMAGE_URL_KEY).and_then(|v| v.as_str()) != Some(image.as_str()) {
                object.insert(IMAGE_URL_KEY.to_string(), image.clone().into());
                changed += 1;
            }
        }
        changed
    }

    fn apply_csv(&self, table: &mut CsvTable) -> usize {
        let Some(url_column) = table.column(PRODUCT_URL_KEY) else {
            return 0;
        };
        let mut changed = 0;
        if table.column(IMAGE_URL_KEY).is_none() {
            changed += 1;
        }
        let image_column = table.add_column(IMAGE_URL_KEY);

        for row in &mut table.rows {
            let Some(image) = self.image_for(&row[url_column]) else {
                continue;
            };
            if row[image_column] != *image {
                row[image_column].clone_from(image);
                changed += 1;
            }
        }
        changed
    }
}

/// Merge the legacy `Image URL` key/column into `ImageURL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolidateImageKeys;

impl CleanupPass for ConsolidateImageKeys {
    fn name(&self) -> &'static str {
        "consolidate-image-keys"
    }

    fn apply_json(&self, objects: &mut [JsonObject]) -> usize {
        let mut changed = 0;
        for object in objects.iter_mut() {
            let Some(legacy) = object.shift_remove(LEGACY_IMAGE_URL_KEY) else {
                continue;
            };
            changed += 1;
            let current_missing = non_empty_str(object, IMAGE_URL_KEY).is_none();
            let legacy_usable = legacy.as_str().is_some_and(|s| !is_blank(s));
            if current_missing && legacy_usable {
                object.insert(IMAGE_URL_KEY.to_string(), legacy);
            }
        }
        changed
    }

    fn apply_csv(&self, table: &mut CsvTable) -> usize {
        let Some(legacy_column) = table.column(LEGACY_IMAGE_URL_KEY) else {
            return 0;
        };
        let image_column = table.add_column(IMAGE_URL_KEY);
        for row in &mut table.rows {
            if is_blank(&row[image_column]) && !is_blank(&row[legacy_column]) {
                row[image_column] = row[legacy_column].clone();
            }
        }
        table.remove_column(LEGACY_IMAGE_URL_KEY);
        1
    }
}

/// Drop weight segments (`25 kg`) from dimension strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripWeight;

/// `"120 x 60 x 75 cm | 25 kg"` → `Some("120 x 60 x 75 cm")`. `None` when
/// there's nothing to strip or stripping would leave nothing.
pub fn strip_weight(value: &str) -> Option<String> {
    if !value.to_lowercase().contains("kg") {
        return None;
    }
    let kept: Vec<&str> = value
        .split('|')
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && !segment.to_lowercase().contains("kg"))
        .collect();
    if kept.is_empty() {
        return None;
    }
    let stripped = kept.join(" | ");
    (stripped != value).then_some(stripped)
}

impl CleanupPass for StripWeight {
    fn name(&self) -> &'static str {
        "strip-weight"
    }

    fn apply_json(&self, objects: &mut [JsonObject]) -> usize {
        let mut changed = 0;
        for object in objects.iter_mut() {
            for key in DIMENSION_KEYS {
                let stripped = object.get(key).and_then(|v| v.as_str()).and_then(strip_weight);
                if let Some(stripped) = stripped {
                    object.insert(key.to_string(), stripped.into());
                    changed += 1;
                }
            }
        }
        changed
    }

    fn apply_csv(&self, table: &mut CsvTable) -> usize {
        let mut changed = 0;
        for key in DIMENSION_KEYS {
            let Some(column) = table.column(key) else {
                continue;
            };
            for row in &mut table.rows {
                if let Some(stripped) = strip_weight(&row[column]) {
                    row[column] = stripped;
                    changed += 1;
                }
            }
        }
        changed
    }
}

/// What a pass did to the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub pass: String,
    pub json_changes: usize,
    pub csv_changes: usize,
    pub backups: Vec<PathBuf>,
    pub dry_run: bool,
}

impl CleanupReport {
    pub fn changed(&self) -> bool {
        self.json_changes > 0 || self.csv_changes > 0
    }
}

pub struct CleanupRunner {
    paths: CombinedPaths,
    dry_run: bool,
}

impl CleanupRunner {
    pub fn new(paths: CombinedPaths, dry_run: bool) -> Self {
        Self { paths, dry_run }
    }

    pub fn for_site(store: &ProductStore, site: Site, dry_run: bool) -> Self {
        Self::new(store.combined_paths(site), dry_run)
    }

    pub fn run(&self, pass: &dyn CleanupPass) -> HarvestResult<CleanupReport> {
        let mut report = CleanupReport {
            pass: pass.name().to_string(),
            dry_run: self.dry_run,
            ..CleanupReport::default()
        };

        // Nothing is written until both projections pass validation.
        let mut staged: Vec<(&Path, Vec<u8>)> = Vec::with_capacity(2);

        if self.paths.json.exists() {
            let mut objects = read_json_objects(&self.paths.json)?;
            report.json_changes = pass.apply_json(&mut objects);
            if report.json_changes > 0 {
                validate_objects(&self.paths.json, &objects)?;
                staged.push((self.paths.json.as_path(), json_objects_bytes(&self.paths.json, &objects)?));
            }
        } else {
            warn!("⚠️ {} not found; skipping JSON", self.paths.json.display());
        }

        if self.paths.csv.exists() {
            let mut table = CsvTable::read(&self.paths.csv)?;
            report.csv_changes = pass.apply_csv(&mut table);
            if report.csv_changes > 0 {
                validate_table(&self.paths.csv, &table)?;
                staged.push((self.paths.csv.as_path(), table.to_bytes(&self.paths.csv)?));
            }
        } else {
            warn!("⚠️ {} not found; skipping CSV", self.paths.csv.display());
        }

        for (path, bytes) in &staged {
            report.backups.extend(self.persist(path, bytes)?);
        }

        info!(
            "🧹 {}: {} JSON and {} CSV changes{}",
            report.pass,
            report.json_changes,
            report.csv_changes,
            if self.dry_run { " (dry run, nothing written)" } else { "" }
        );
        Ok(report)
    }

    fn persist(&self, path: &Path, bytes: &[u8]) -> HarvestResult<Option<PathBuf>> {
        if self.dry_run {
            debug!("Dry run: not writing {}", path.display());
            return Ok(None);
        }
        AtomicFileUpdate::new(path).write(bytes)
    }
}

fn check_unique(path: &Path, ids: impl Iterator<Item = String>) -> HarvestResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.clone()) {
            return Err(HarvestError::InconsistentStore(format!(
                "duplicate ID {id} in {}",
                path.display()
            )));
        }
    }
    Ok(())
}

fn validate_objects(path: &Path, objects: &[JsonObject]) -> HarvestResult<()> {
    for (index, object) in objects.iter().enumerate() {
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|key| !object.contains_key(**key)) {
            return Err(HarvestError::InconsistentStore(format!(
                "record {index} in {} has no '{missing}'",
                path.display()
            )));
        }
    }
    check_unique(
        path,
        objects
            .iter()
            .filter_map(|o| o.get(ID_KEY).map(|id| id.as_str().map_or_else(|| id.to_string(), ToString::to_string))),
    )
}

fn validate_table(path: &Path, table: &CsvTable) -> HarvestResult<()> {
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| table.column(c).is_none()) {
        return Err(HarvestError::InconsistentStore(format!(
            "{} has no '{missing}' column",
            path.display()
        )));
    }
    let id_column = table.column(ID_KEY).unwrap_or_default();
    check_unique(path, table.rows.iter().map(|row| row[id_column].clone()))
}
