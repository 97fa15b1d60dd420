//! Per-site harvest run
//!
//! Query → links → raw records → normalized → rating filter → dedupe →
//! per-query file. Queries run one after another; a query that ends up
//! with nothing is reported and skipped, and only configuration or
//! persistence failures stop the run.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::application::detail_extraction::DetailExtractor;
use crate::application::link_discovery::LinkDiscoverer;
use crate::domain::{Normalizer, SearchQuery, dedupe};
use crate::error::HarvestResult;
use crate::infrastructure::config::{AppConfig, NetworkConfig};
use crate::infrastructure::debug_capture::DebugCapture;
use crate::infrastructure::http_client::Fetcher;
use crate::infrastructure::renderer::PageRenderer;
use crate::infrastructure::sites::{Site, SiteProfile};
use crate::infrastructure::storage::ProductStore;

/// Counters for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryReport {
    pub query: String,
    pub links_found: usize,
    pub extracted: usize,
    pub fetch_failures: usize,
    pub rejected: usize,
    pub filtered_by_rating: usize,
    pub duplicates_removed: usize,
    pub saved: usize,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarvestReport {
    pub site: Site,
    pub queries: Vec<QueryReport>,
}

impl HarvestReport {
    pub fn total_saved(&self) -> usize {
        self.queries.iter().map(|q| q.saved).sum()
    }

    /// Queries that produced no file
    pub fn empty_queries(&self) -> Vec<&str> {
        self.queries
            .iter()
            .filter(|q| q.saved == 0)
            .map(|q| q.query.as_str())
            .collect()
    }

    pub fn log_summary(&self) {
        info!("📊 Harvest summary for {}", self.site);
        for q in &self.queries {
            info!(
                "  '{}': links {}, extracted {}, failed {}, rejected {}, below rating {}, duplicates {}, saved {}",
                q.query,
                q.links_found,
                q.extracted,
                q.fetch_failures,
                q.rejected,
                q.filtered_by_rating,
                q.duplicates_removed,
                q.saved
            );
        }
        info!("✅ {} products saved across {} queries", self.total_saved(), self.queries.len());
    }
}

pub struct HarvestPipeline {
    site: Site,
    fetcher: Fetcher,
    discoverer: LinkDiscoverer,
    extractor: DetailExtractor,
    normalizer: Normalizer,
    store: ProductStore,
    network: NetworkConfig,
}

impl HarvestPipeline {
    /// Build every component up front so setup problems surface before
    /// the first request.
    pub fn new(profile: SiteProfile, config: &AppConfig, renderer: Arc<dyn PageRenderer>) -> HarvestResult<Self> {
        config.validate()?;
        let captures = DebugCapture::new(config.paths.debug_dir.clone(), profile.site.as_str());

        Ok(Self {
            site: profile.site,
            fetcher: Fetcher::for_site(&profile, &config.network, captures, renderer)?,
            discoverer: LinkDiscoverer::new(&profile, &config.harvest, &config.network)?,
            extractor: DetailExtractor::new(&profile)?,
            normalizer: Normalizer::new()?,
            store: ProductStore::new(&config.paths.output_dir),
            network: config.network.clone(),
        })
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }

    pub async fn run(&mut self, queries: &[SearchQuery]) -> HarvestResult<HarvestReport> {
        let mut report = HarvestReport {
            site: self.site,
            queries: Vec::with_capacity(queries.len()),
        };
        for query in queries {
            report.queries.push(self.run_query(query).await?);
        }
        Ok(report)
    }

    pub async fn run_query(&mut self, query: &SearchQuery) -> HarvestResult<QueryReport> {
        let mut report = QueryReport {
            query: query.text.clone(),
            ..QueryReport::default()
        };

        let links = self.discoverer.discover(&mut self.fetcher, query).await;
        report.links_found = links.len();

        let mut records = Vec::new();
        for (index, link) in links.iter().enumerate() {
            if records.len() >= query.target {
                break;
            }
            if index > 0 {
                sleep(self.network.request_delay() + self.network.jitter()).await;
            }

            let Some(raw) = self.extractor.extract(&self.fetcher, &link.url).await else {
                report.fetch_failures += 1;
                continue;
            };
            report.extracted += 1;

            let Some(record) = self.normalizer.normalize(raw) else {
                report.rejected += 1;
                continue;
            };

            if record.rating.is_some_and(|rating| rating < query.min_rating) {
                report.filtered_by_rating += 1;
                continue;
            }

            info!("📦 {} {}", record.id, record.name);
            records.push(record);
        }

        let collected = records.len();
        let unique = dedupe(records);
        report.duplicates_removed = collected - unique.len();

        if unique.is_empty() {
            warn!("⚠️ No valid products for '{}'; nothing saved", query.text);
            return Ok(report);
        }

        report.output = Some(self.store.save_query_records(self.site, &query.text, &unique)?);
        report.saved = unique.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_totals_and_empty_queries() {
        let report = HarvestReport {
            site: Site::Amazon,
            queries: vec![
                QueryReport {
                    query: "sofa".into(),
                    saved: 7,
                    ..QueryReport::default()
                },
                QueryReport {
                    query: "bed".into(),
                    ..QueryReport::default()
                },
            ],
        };
        assert_eq!(report.total_saved(), 7);
        assert_eq!(report.empty_queries(), vec!["bed"]);
    }
}
