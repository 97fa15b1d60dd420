//! HTML parsing for search result and product pages
//!
//! Parsers compile their selectors and patterns once at construction and
//! fail fast on a bad configuration. Parsing itself never fails: a field
//! that can't be found is `None`.
//!
//! `scraper::Html` is not `Send`, so documents are parsed and dropped
//! inside synchronous functions and never held across an `.await`.

pub mod config;
pub mod product_detail_parser;
pub mod product_list_parser;
pub mod strategy;
pub mod structured_data;

pub use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};
pub use config::{LinkStyle, ProductDetailSelectors, ProductListSelectors};
pub use product_detail_parser::ProductDetailParser;
pub use product_list_parser::{ParsedListPage, ProductListParser};
pub use strategy::StrategyChain;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::domain::services::collapse_whitespace;

/// Compile a selector list, skipping invalid entries.
///
/// Fails only when nothing compiles. An empty input list is allowed and
/// yields an empty chain.
pub fn compile_selectors(field: &str, selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::with_capacity(selector_strings.len());
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile {} selector '{}': {}", field, selector_str, e);
                errors.push(format!("'{selector_str}': {e}"));
            }
        }
    }

    if selectors.is_empty() && !errors.is_empty() {
        return Err(ParsingError::NoValidSelectors {
            field: field.to_string(),
            errors: errors.join(", "),
        });
    }

    if !errors.is_empty() {
        debug!("Some {} selectors failed to compile: {}", field, errors.join(", "));
    }

    Ok(selectors)
}

pub fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, e))
}

pub fn compile_pattern(pattern: &str) -> ParsingResult<Regex> {
    Regex::new(pattern).map_err(|e| ParsingError::invalid_pattern(pattern, e))
}

/// Whitespace-collapsed text of an element, `None` when empty.
pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// First non-empty text across a selector chain, in chain order.
pub fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|selector| document.select(selector))
        .find_map(element_text)
}

/// Resolve a possibly relative href against a base URL.
pub fn resolve_url(base_url: &str, href: &str) -> ParsingResult<String> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }

    let base = Url::parse(base_url).map_err(|e| ParsingError::UrlResolutionFailed {
        url: href.to_string(),
        reason: e.to_string(),
        base_url: Some(base_url.to_string()),
    })?;
    base.join(href)
        .map(String::from)
        .map_err(|e| ParsingError::UrlResolutionFailed {
            url: href.to_string(),
            reason: e.to_string(),
            base_url: Some(base_url.to_string()),
        })
}
