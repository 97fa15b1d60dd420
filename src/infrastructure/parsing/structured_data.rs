//! Structured metadata embedded in product pages
//!
//! JSON-LD `Product` objects (top-level, in arrays, or under `@graph`) and
//! the `description` / OpenGraph meta tags. Values are returned as raw
//! strings for the Normalizer to coerce.

use scraper::{Html, Selector};
use serde_json::Value;

use super::{ParsingResult, compile_selector};

/// Fields of the first JSON-LD `Product` on a page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub image: Option<String>,
}

pub struct StructuredDataReader {
    jsonld: Selector,
    meta_description: Selector,
    og_description: Selector,
    og_image: Selector,
}

impl StructuredDataReader {
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            jsonld: compile_selector(r#"script[type="application/ld+json"]"#)?,
            meta_description: compile_selector(r#"meta[name="description"]"#)?,
            og_description: compile_selector(r#"meta[property="og:description"]"#)?,
            og_image: compile_selector(r#"meta[property="og:image"]"#)?,
        })
    }

    /// First JSON-LD product on the page. Malformed blocks are skipped.
    pub fn product(&self, document: &Html) -> Option<JsonLdProduct> {
        document
            .select(&self.jsonld)
            .filter_map(|script| serde_json::from_str::<Value>(script.inner_html().trim()).ok())
            .find_map(|value| find_product(&value).map(parse_product))
    }

    pub fn meta_description(&self, document: &Html) -> Option<String> {
        meta_content(document, &self.meta_description)
    }

    pub fn og_description(&self, document: &Html) -> Option<String> {
        meta_content(document, &self.og_description)
    }

    pub fn og_image(&self, document: &Html) -> Option<String> {
        meta_content(document, &self.og_image)
    }
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(ToString::to_string)
}

fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == "Product" || t == "ProductGroup",
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| matches!(t.as_str(), Some("Product" | "ProductGroup"))),
        _ => false,
    }
}

fn find_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_product),
        Value::Object(map) => {
            if is_product(value) {
                return Some(value);
            }
            map.get("@graph").and_then(find_product)
        }
        _ => None,
    }
}

/// Strings and numbers as text; everything else is absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_of(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    }
}

fn parse_product(v: &Value) -> JsonLdProduct {
    let offer = v.get("offers").and_then(first_of);

    JsonLdProduct {
        name: v.get("name").and_then(scalar_text),
        description: v.get("description").and_then(scalar_text),
        price: offer
            .and_then(|o| o.get("price").or_else(|| o.get("lowPrice")))
            .and_then(scalar_text),
        rating: v
            .get("aggregateRating")
            .and_then(|r| r.get("ratingValue"))
            .and_then(scalar_text),
        image: v.get("image").and_then(first_of).and_then(|image| {
            scalar_text(image).or_else(|| image.get("url").and_then(scalar_text))
        }),
    }
}
