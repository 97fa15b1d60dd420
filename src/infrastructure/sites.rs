//! Site profiles
//!
//! Everything that differs between the supported storefronts lives here:
//! URLs, dataset id prefix, block/no-results phrases and selector sets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::infrastructure::parsing::config::{ProductDetailSelectors, ProductListSelectors};

/// Supported storefronts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Amazon,
    Flipkart,
}

impl Site {
    /// Lowercase name used in file names (`amazon_study_table.json`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Flipkart => "flipkart",
        }
    }

    pub fn profile(self) -> SiteProfile {
        match self {
            Self::Amazon => SiteProfile::amazon(),
            Self::Flipkart => SiteProfile::flipkart(),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub site: Site,
    /// Dataset id prefix (`A` → `A-0001`)
    pub id_prefix: &'static str,
    pub base_url: String,
    /// Search path appended to `base_url`, query parameter last
    pub search_path: String,
    /// Lowercase phrases identifying an anti-bot page
    pub block_phrases: Vec<String>,
    /// Lowercase phrases identifying an empty result page
    pub no_results_phrases: Vec<String>,
    pub list: ProductListSelectors,
    pub detail: ProductDetailSelectors,
}

fn phrases(items: &[&str]) -> Vec<String> {
    items.iter().map(|p| p.to_lowercase()).collect()
}

impl SiteProfile {
    pub fn amazon() -> Self {
        Self {
            site: Site::Amazon,
            id_prefix: "A",
            base_url: "https://www.amazon.in".to_string(),
            search_path: "/s?k=".to_string(),
            block_phrases: phrases(&[
                "detected unusual traffic",
                "enter the characters you see",
                "robot check",
                "are you a human",
                "type the characters",
                "access to this page has been denied",
            ]),
            no_results_phrases: phrases(&[
                "did not match any products",
                "no results for",
                "did not match any results",
            ]),
            list: ProductListSelectors::amazon(),
            detail: ProductDetailSelectors::amazon(),
        }
    }

    pub fn flipkart() -> Self {
        Self {
            site: Site::Flipkart,
            id_prefix: "F",
            base_url: "https://www.flipkart.com".to_string(),
            search_path: "/search?q=".to_string(),
            block_phrases: phrases(&[
                "<title>access denied</title>",
                "access to this page has been denied",
                "please ensure you are not using a proxy",
                "browser is being managed by your organization",
            ]),
            no_results_phrases: phrases(&[
                "sorry, no results found",
                "no matches found",
                "did not match any products",
            ]),
            list: ProductListSelectors::flipkart(),
            detail: ProductDetailSelectors::flipkart(),
        }
    }

    /// Point the profile at another host (mirrors, local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of one search result page; pages start at 1.
    pub fn search_page_url(&self, query: &str, page: u32) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        format!("{}{}{}&page={}", self.base_url, self.search_path, encoded, page)
    }
}
