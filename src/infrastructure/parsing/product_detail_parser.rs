//! Product detail page parser
//!
//! Every field is a `StrategyChain`, tried in order until one yields a
//! value:
//!
//! | field      | strategies                                                        |
//! |------------|-------------------------------------------------------------------|
//! | name       | site title selectors, generic `h1`                                |
//! | rating     | rating widget text, JSON-LD `aggregateRating`                     |
//! | price      | price widgets, JSON-LD offer, currency amount in descriptions     |
//! | image      | primary image attributes, JSON-LD / `og:image`, any product `img` |
//! | dimensions | labelled spec rows, generic row heuristic                         |
//!
//! Missing DOM nodes and malformed attribute values just make a strategy
//! return `None`.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::config::ProductDetailSelectors;
use super::strategy::StrategyChain;
use super::structured_data::StructuredDataReader;
use super::{ParsingError, ParsingResult, compile_pattern, compile_selector, compile_selectors, element_text, first_text};
use crate::domain::RawProductRecord;
use crate::domain::services::{collapse_whitespace, strip_invisible};

/// Currency-prefixed amount inside free text (`₹12,999`, `Rs. 4,500`, `$89.99`)
const CURRENCY_AMOUNT_PATTERN: &str = r"(?:₹|Rs\.?|INR|\$)\s?[\d,]+(?:\.\d+)?";

/// First number in rating text; thousands separators kept so review
/// counts like `1,234 ratings` read as 1234, not 1
const RATING_NUMBER_PATTERN: &str = r"\d[\d,]*(?:\.\d+)?";

/// Top of the star scale both sites use
const MAX_RATING: f64 = 5.0;

/// Length unit directly after a number
const UNIT_PATTERN: &str = r"(?i)\d\s*(?:cm|mm|inch(?:es)?)\b";

/// `<number> x <number>` separator
const CROSS_PATTERN: &str = r"(?i)\d\s*x\s*\d";

/// Rows longer than this are page sections, not spec rows
const MAX_ROW_CHARS: usize = 200;

/// At most this many heuristic dimension rows are joined
const MAX_DIMENSION_ROWS: usize = 2;

pub struct ProductDetailParser {
    base_url: String,
    detail_id: Regex,
    canonical_path: Option<String>,
    name: StrategyChain,
    rating: StrategyChain,
    price: StrategyChain,
    image: StrategyChain,
    dimensions: StrategyChain,
}

impl ProductDetailParser {
    pub fn new(selectors: &ProductDetailSelectors, base_url: &str) -> ParsingResult<Self> {
        let structured = Arc::new(StructuredDataReader::new()?);
        let currency_amount = compile_pattern(CURRENCY_AMOUNT_PATTERN)?;
        let rating_number = compile_pattern(RATING_NUMBER_PATTERN)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            detail_id: compile_pattern(&selectors.detail_id_pattern)?,
            canonical_path: selectors.canonical_path.clone(),
            name: name_chain(selectors)?,
            rating: rating_chain(selectors, Arc::clone(&structured), rating_number)?,
            price: price_chain(selectors, Arc::clone(&structured), currency_amount)?,
            image: image_chain(selectors, structured)?,
            dimensions: dimension_chain(selectors)?,
        })
    }

    /// Site id from a product URL.
    pub fn detail_id(&self, url: &str) -> Option<String> {
        self.detail_id
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Canonical product URL, or the URL as given when the site has no
    /// canonical form or the id can't be found.
    pub fn canonical_url(&self, url: &str) -> String {
        match (&self.canonical_path, self.detail_id(url)) {
            (Some(template), Some(id)) => format!("{}{}", self.base_url, template.replace("{id}", &id)),
            _ => url.trim().to_string(),
        }
    }

    pub fn parse(&self, body: &str, id: &str, url: &str) -> RawProductRecord {
        let document = Html::parse_document(body);
        let record = RawProductRecord {
            id: id.to_string(),
            url: url.to_string(),
            name: self.name.extract(&document),
            rating: self.rating.extract(&document),
            price: self.price.extract(&document),
            dimensions: self.dimensions.extract(&document),
            image_url: self.image.extract(&document),
        };
        debug!(
            "Parsed {}: name={} rating={:?} price={:?} dims={:?} image={}",
            id,
            record.name.is_some(),
            record.rating,
            record.price,
            record.dimensions,
            record.image_url.is_some()
        );
        record
    }
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn name_chain(selectors: &ProductDetailSelectors) -> ParsingResult<StrategyChain> {
    let titles = compile_selectors("title", &selectors.title)?;
    let heading = compile_selector("h1")?;

    Ok(StrategyChain::new("name")
        .then("title-selectors", move |doc| first_text(doc, &titles))
        .then("generic-heading", move |doc| doc.select(&heading).find_map(element_text)))
}

fn rating_chain(
    selectors: &ProductDetailSelectors,
    structured: Arc<StructuredDataReader>,
    number: Regex,
) -> ParsingResult<StrategyChain> {
    let widgets = compile_selectors("rating", &selectors.rating)?;
    let widget_number = number.clone();

    Ok(StrategyChain::new("rating")
        .then("rating-widget", move |doc| {
            widgets
                .iter()
                .flat_map(|selector| doc.select(selector))
                .filter_map(element_text)
                .find(|text| is_rating(text, &widget_number))
        })
        .then("jsonld-aggregate-rating", move |doc| {
            structured.product(doc)?.rating.filter(|r| is_rating(r, &number))
        }))
}

/// Text whose first number is a value on the star scale.
fn is_rating(text: &str, number: &Regex) -> bool {
    number
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .is_some_and(|value| (0.0..=MAX_RATING).contains(&value))
}

fn price_chain(
    selectors: &ProductDetailSelectors,
    structured: Arc<StructuredDataReader>,
    currency_amount: Regex,
) -> ParsingResult<StrategyChain> {
    let widgets = compile_selectors("price", &selectors.price)?;
    let offer_reader = Arc::clone(&structured);
    let amount = move |text: Option<String>| -> Option<String> {
        currency_amount.find(&text?).map(|m| m.as_str().to_string())
    };

    Ok(StrategyChain::new("price")
        .then("price-widgets", move |doc| {
            widgets
                .iter()
                .flat_map(|selector| doc.select(selector))
                .filter_map(element_text)
                .find(|text| has_digit(text))
        })
        .then("jsonld-offer", move |doc| {
            offer_reader.product(doc)?.price.filter(|p| has_digit(p))
        })
        .then("metadata-description", move |doc| {
            let from_jsonld = structured.product(doc).and_then(|p| p.description);
            amount(from_jsonld)
                .or_else(|| amount(structured.meta_description(doc)))
                .or_else(|| amount(structured.og_description(doc)))
        }))
}

fn image_chain(selectors: &ProductDetailSelectors, structured: Arc<StructuredDataReader>) -> ParsingResult<StrategyChain> {
    let primary = compile_selectors("image", &selectors.image)?;
    let attributes = selectors.image_attributes.clone();
    let any_image = compile_selector("img[src]")?;

    Ok(StrategyChain::new("image")
        .then("primary-image", move |doc| {
            primary
                .iter()
                .flat_map(|selector| doc.select(selector))
                .find_map(|img| {
                    attributes
                        .iter()
                        .filter_map(|attr| img.value().attr(attr))
                        .find_map(|value| image_attribute_url(value).ok().flatten())
                })
        })
        .then("structured-image", move |doc| {
            structured
                .product(doc)
                .and_then(|p| p.image)
                .filter(|url| is_http_url(url))
                .or_else(|| structured.og_image(doc).filter(|url| is_http_url(url)))
        })
        .then("any-product-image", move |doc| {
            doc.select(&any_image)
                .filter_map(|img| img.value().attr("src"))
                .map(str::trim)
                .find(|src| is_eligible_image(src))
                .map(ToString::to_string)
        }))
}

/// URL from an image attribute. A JSON mapping of `url → [w, h]` yields
/// its first key; anything that isn't absolute http(s) is ignored.
fn image_attribute_url(value: &str) -> ParsingResult<Option<String>> {
    let value = value.trim();
    if value.starts_with('{') {
        let parsed: Value = serde_json::from_str(value).map_err(|e| ParsingError::MalformedAttribute {
            attribute: "image mapping".to_string(),
            reason: e.to_string(),
        })?;
        let first_key = parsed
            .as_object()
            .and_then(|map| map.keys().next())
            .filter(|key| is_http_url(key))
            .cloned();
        return Ok(first_key);
    }
    Ok(is_http_url(value).then(|| value.to_string()))
}

fn is_eligible_image(src: &str) -> bool {
    if !is_http_url(src) {
        return false;
    }
    let path = src.split(['?', '#']).next().unwrap_or(src).to_ascii_lowercase();
    !(path.ends_with(".svg") || path.ends_with(".gif"))
}

fn dimension_chain(selectors: &ProductDetailSelectors) -> ParsingResult<StrategyChain> {
    let containers = compile_selectors("spec container", &selectors.spec_containers)?;
    let rows = compile_selector("tr, li")?;
    let labels: Vec<String> = selectors.dimension_labels.iter().map(|l| l.to_ascii_lowercase()).collect();

    let generic_rows = compile_selectors("generic row", &selectors.generic_rows)?;
    let unit = compile_pattern(UNIT_PATTERN)?;
    let cross = compile_pattern(CROSS_PATTERN)?;

    Ok(StrategyChain::new("dimensions")
        .then("labelled-spec-row", move |doc| {
            containers
                .iter()
                .flat_map(|selector| doc.select(selector))
                .find_map(|container| labelled_dimension(container, &rows, &labels))
        })
        .then("row-heuristic", move |doc| {
            let mut matches: Vec<String> = Vec::new();
            let candidates = generic_rows
                .iter()
                .flat_map(|selector| doc.select(selector))
                .filter_map(|row| element_text(row).map(|text| strip_invisible(&text)));

            for text in candidates {
                if text.chars().count() > MAX_ROW_CHARS || matches.contains(&text) {
                    continue;
                }
                let lower = text.to_lowercase();
                let dimension_like = lower.contains("dimension")
                    || (lower.contains("width") && lower.contains("height"))
                    || (unit.is_match(&text) && cross.is_match(&text));
                if dimension_like {
                    matches.push(text);
                    if matches.len() == MAX_DIMENSION_ROWS {
                        break;
                    }
                }
            }
            (!matches.is_empty()).then(|| matches.join(" | "))
        }))
}

/// Value following the first dimension label found in a container's rows.
fn labelled_dimension(container: ElementRef<'_>, rows: &Selector, labels: &[String]) -> Option<String> {
    let mut row_texts: Vec<String> = container.select(rows).filter_map(element_text).collect();
    if row_texts.is_empty() {
        row_texts.extend(element_text(container));
    }

    row_texts.iter().find_map(|row| {
        let row = collapse_whitespace(&strip_invisible(row));
        let lower = row.to_ascii_lowercase();
        labels.iter().find_map(|label| {
            let start = lower.find(label.as_str())? + label.len();
            let value = strip_invisible(row[start..].trim_start_matches(|c: char| c == ':' || c.is_whitespace()));
            let value = value.trim_start_matches(':').trim();
            (!value.is_empty()).then(|| value.to_string())
        })
    })
}
