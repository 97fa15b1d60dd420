//! Product page extraction

use tracing::{debug, warn};
use url::Url;

use crate::domain::RawProductRecord;
use crate::error::HarvestResult;
use crate::infrastructure::http_client::{Fetcher, Retrieval};
use crate::infrastructure::parsing::ProductDetailParser;
use crate::infrastructure::sites::SiteProfile;

/// Shortest path segment accepted as an id when the site pattern misses
const MIN_FALLBACK_ID_LEN: usize = 5;

pub struct DetailExtractor {
    parser: ProductDetailParser,
}

impl DetailExtractor {
    pub fn new(profile: &SiteProfile) -> HarvestResult<Self> {
        Ok(Self {
            parser: ProductDetailParser::new(&profile.detail, &profile.base_url)?,
        })
    }

    /// Fetch and parse one product page. `None` means the page could not
    /// be retrieved and the product is skipped.
    pub async fn extract(&self, fetcher: &Fetcher, url: &str) -> Option<RawProductRecord> {
        let canonical = self.parser.canonical_url(url);
        let id = self
            .parser
            .detail_id(&canonical)
            .or_else(|| fallback_id(&canonical))
            .unwrap_or_else(|| "unknown".to_string());

        match fetcher.fetch_with_retry(&canonical, &format!("product_{id}")).await {
            Retrieval::Page(outcome) => {
                debug!("Extracting {} ({} bytes, rendered: {})", id, outcome.body.len(), outcome.rendered);
                Some(self.parser.parse(&outcome.body, &id, &canonical))
            }
            Retrieval::GaveUp { last_status, attempts } => {
                warn!(
                    "⏭️ Skipping {} after {} attempts (last status {:?})",
                    canonical, attempts, last_status
                );
                None
            }
        }
    }
}

/// Last non-empty path segment of a URL, if long enough to be an id.
fn fallback_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .rfind(|segment| !segment.is_empty())
        .filter(|segment| segment.len() >= MIN_FALLBACK_ID_LEN)
        .map(ToString::to_string)
}
