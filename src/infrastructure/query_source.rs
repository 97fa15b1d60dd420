//! Search query file loader
//!
//! ```json
//! { "searchQueries": [{ "query": "study table" }],
//!   "settings": { "minRating": 3.5, "maxProducts": 50 } }
//! ```

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::domain::product::SearchQuery;
use crate::error::{HarvestError, HarvestResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryFile {
    search_queries: Vec<QueryEntry>,
    settings: QuerySettings,
}

#[derive(Debug, Deserialize)]
struct QueryEntry {
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuerySettings {
    min_rating: f64,
    #[serde(default)]
    max_products: Option<usize>,
}

/// Validated queries ready for a harvest run
#[derive(Debug, Clone)]
pub struct QuerySource {
    pub queries: Vec<SearchQuery>,
    pub min_rating: f64,
}

impl QuerySource {
    /// Read and validate a query file. Any problem is a configuration error.
    pub async fn load(path: &Path, default_target: usize) -> HarvestResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| HarvestError::config(format!("Query file {} not readable: {e}", path.display())))?;

        let source = Self::from_json(&content, default_target)
            .map_err(|e| HarvestError::config(format!("Query file {}: {e}", path.display())))?;

        info!(
            "📋 Loaded {} queries from {} (min rating {})",
            source.queries.len(),
            path.display(),
            source.min_rating
        );
        Ok(source)
    }

    /// Parse query file content. `settings.maxProducts` overrides `default_target`.
    pub fn from_json(content: &str, default_target: usize) -> Result<Self, String> {
        let file: QueryFile = serde_json::from_str(content).map_err(|e| format!("invalid shape: {e}"))?;

        if !file.settings.min_rating.is_finite() || file.settings.min_rating < 0.0 {
            return Err(format!("settings.minRating must be a non-negative number, got {}", file.settings.min_rating));
        }
        if file.search_queries.is_empty() {
            return Err("searchQueries is empty".to_string());
        }

        let target = file.settings.max_products.unwrap_or(default_target);
        let queries = file
            .search_queries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let text = entry.query.trim();
                if text.is_empty() {
                    Err(format!("searchQueries[{index}].query is blank"))
                } else {
                    Ok(SearchQuery::new(text, target, file.settings.min_rating))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            queries,
            min_rating: file.settings.min_rating,
        })
    }

    /// Override every query's target (the CLI `--limit`).
    pub fn with_target(mut self, target: usize) -> Self {
        for query in &mut self.queries {
            query.target = target;
        }
        self
    }
}
