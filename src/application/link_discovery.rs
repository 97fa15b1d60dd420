//! Search result pagination
//!
//! Walks result pages from page 1 and collects candidate links until the
//! query's target is reached or the site stops giving results. Every
//! budget (block retries, error retries, page requests) is per query, so a
//! bad query can't starve the next one.

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::{CandidateLink, SearchQuery};
use crate::error::HarvestResult;
use crate::infrastructure::config::{HarvestConfig, NetworkConfig};
use crate::infrastructure::http_client::{FetchStatus, Fetcher};
use crate::infrastructure::parsing::ProductListParser;
use crate::infrastructure::sites::SiteProfile;

pub struct LinkDiscoverer {
    profile: SiteProfile,
    parser: ProductListParser,
    block_retry_budget: u32,
    max_page_requests: u32,
    max_error_retries: u32,
    request_delay: Duration,
    network: NetworkConfig,
}

/// What to do before the next page request
enum Next {
    Page,
    RetryBlocked,
    RetryError(u32),
}

impl LinkDiscoverer {
    pub fn new(profile: &SiteProfile, harvest: &HarvestConfig, network: &NetworkConfig) -> HarvestResult<Self> {
        Ok(Self {
            parser: ProductListParser::new(&profile.list, &profile.base_url)?,
            profile: profile.clone(),
            block_retry_budget: harvest.block_retry_budget,
            max_page_requests: harvest.max_page_requests,
            max_error_retries: network.max_retries.max(1),
            request_delay: network.request_delay(),
            network: network.clone(),
        })
    }

    /// Collect up to `query.target` links with unique ids, in discovery order.
    pub async fn discover(&self, fetcher: &mut Fetcher, query: &SearchQuery) -> Vec<CandidateLink> {
        let mut links: Vec<CandidateLink> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut page: u32 = 1;
        let mut requests: u32 = 0;
        let mut block_retries: u32 = 0;
        let mut error_attempts: u32 = 0;
        let mut headless_page: Option<u32> = None;
        let mut empty_first_page_retried = false;
        let mut next: Option<Next> = None;

        info!("🔎 Discovering products for '{}' (target {})", query.text, query.target);

        while links.len() < query.target {
            if requests >= self.max_page_requests {
                warn!(
                    "⛔ Page request cap ({}) reached for '{}'",
                    self.max_page_requests, query.text
                );
                break;
            }

            match next.take() {
                Some(Next::RetryError(attempt)) => {
                    sleep(fetcher.retry().linear_delay(self.request_delay, attempt)).await;
                }
                Some(Next::Page | Next::RetryBlocked) => sleep(self.page_delay()).await,
                None => {}
            }

            let url = self.profile.search_page_url(&query.text, page);
            let capture_key = format!("search_{}_page{}", query.text, page);
            requests += 1;
            debug!("Fetching result page {} for '{}': {}", page, query.text, url);

            let mut outcome = fetcher.fetch(&url).await;

            if outcome.status == FetchStatus::Blocked && fetcher.headless_enabled() && headless_page != Some(page) {
                headless_page = Some(page);
                fetcher.capture(&capture_key, &url, &outcome.body).await;
                if let Some(rendered) = fetcher.render(&url).await {
                    outcome = rendered;
                }
            }

            match outcome.status {
                FetchStatus::Blocked => {
                    fetcher.capture(&capture_key, &url, &outcome.body).await;
                    block_retries += 1;
                    if block_retries > self.block_retry_budget {
                        warn!(
                            "🚫 Still blocked after {} retries; abandoning '{}' with {} links",
                            self.block_retry_budget,
                            query.text,
                            links.len()
                        );
                        break;
                    }
                    warn!("🚫 Blocked on page {} for '{}'; rotating User-Agent", page, query.text);
                    fetcher.rotate_user_agent();
                    next = Some(Next::RetryBlocked);
                    continue;
                }
                FetchStatus::NoResults => {
                    info!("🏁 No more results for '{}' at page {}", query.text, page);
                    break;
                }
                FetchStatus::Error => {
                    fetcher.capture(&capture_key, &url, &outcome.body).await;
                    error_attempts += 1;
                    if error_attempts >= self.max_error_retries {
                        warn!(
                            "❌ Result page errors exhausted ({}) for '{}'; keeping {} links",
                            error_attempts,
                            query.text,
                            links.len()
                        );
                        break;
                    }
                    warn!(
                        "⚠️ Error on page {} for '{}' (status {:?}); retrying",
                        page, query.text, outcome.http_status
                    );
                    next = Some(Next::RetryError(error_attempts));
                    continue;
                }
                FetchStatus::Ok => {}
            }

            let parsed = self.parser.parse(&outcome.body);
            let mut added = absorb(&mut links, &mut seen, parsed.primary, query.target);
            if links.len() < query.target {
                added += absorb(&mut links, &mut seen, parsed.anchors, query.target);
            }
            debug!("Page {} added {} new links ({} total)", page, added, links.len());

            if added == 0 {
                if page == 1 && !empty_first_page_retried {
                    empty_first_page_retried = true;
                    warn!("⚠️ No product ids on the first page for '{}'; retrying once", query.text);
                    fetcher.capture(&capture_key, &url, &outcome.body).await;
                    fetcher.rotate_user_agent();
                    next = Some(Next::RetryBlocked);
                    continue;
                }
                if page == 1 {
                    warn!("⚠️ No product ids found for '{}'", query.text);
                } else {
                    info!("🏁 Page {} had no new products for '{}'", page, query.text);
                }
                break;
            }

            page += 1;
            next = Some(Next::Page);
        }

        info!("🔗 Found {} product links for '{}'", links.len(), query.text);
        links
    }

    /// Pause between successive result page requests.
    fn page_delay(&self) -> Duration {
        self.request_delay + self.network.jitter()
    }
}

/// Append unseen candidates until `target`; returns how many were added.
fn absorb(
    links: &mut Vec<CandidateLink>,
    seen: &mut HashSet<String>,
    candidates: Vec<CandidateLink>,
    target: usize,
) -> usize {
    let mut added = 0;
    for candidate in candidates {
        if links.len() >= target {
            break;
        }
        if seen.insert(candidate.id.clone()) {
            links.push(candidate);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str) -> CandidateLink {
        CandidateLink::new(id, format!("https://www.amazon.in/dp/{id}"))
    }

    #[test]
    fn absorb_skips_seen_ids_and_stops_at_target() {
        let mut links = vec![link("B0AAAAAAA1")];
        let mut seen: HashSet<String> = links.iter().map(|l| l.id.clone()).collect();

        let added = absorb(
            &mut links,
            &mut seen,
            vec![link("B0AAAAAAA1"), link("B0AAAAAAA2"), link("B0AAAAAAA2"), link("B0AAAAAAA3"), link("B0AAAAAAA4")],
            3,
        );

        assert_eq!(added, 2);
        let ids: Vec<_> = links.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["B0AAAAAAA1", "B0AAAAAAA2", "B0AAAAAAA3"]);
    }
}
