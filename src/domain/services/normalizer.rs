//! Raw → normalized record coercion
//!
//! Every raw field is optional text; this turns it into typed values and
//! rejects records whose name can't be used as a product name.

use regex::Regex;
use tracing::debug;

use crate::domain::product::{NOT_AVAILABLE, NormalizedProductRecord, RawProductRecord};
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// First decimal number in a string, e.g. `4.3` in `"4.3 out of 5 stars"`.
const NUMBER_PATTERN: &str = r"\d+(?:\.\d+)?";

/// Currency markers removed from price text before reading the number.
const CURRENCY_MARKERS: &[&str] = &["₹", "$", "€", "£", "Rs.", "INR"];

/// Bidi and format marks that leak into product titles and spec tables.
const INVISIBLE_CHARS: &[char] = &[
    '\u{200E}', '\u{200F}', '\u{202A}', '\u{202B}', '\u{202C}', '\u{202D}', '\u{202E}',
];

/// Remove invisible formatting characters and trim.
pub fn strip_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Collapse every run of whitespace to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_placeholder(text: &str) -> bool {
    text.is_empty() || text.eq_ignore_ascii_case(NOT_AVAILABLE) || text.eq_ignore_ascii_case("N/A")
}

/// Clean a free-text field; placeholders and blanks become `None`.
fn clean_text(value: Option<&str>) -> Option<String> {
    let cleaned = collapse_whitespace(&strip_invisible(value?));
    (!is_placeholder(&cleaned)).then_some(cleaned)
}

pub struct Normalizer {
    number: Regex,
}

impl Normalizer {
    pub fn new() -> ParsingResult<Self> {
        let number = Regex::new(NUMBER_PATTERN)
            .map_err(|e| ParsingError::invalid_pattern(NUMBER_PATTERN, e))?;
        Ok(Self { number })
    }

    /// Coerce a raw record; `None` means the record was rejected.
    pub fn normalize(&self, raw: RawProductRecord) -> Option<NormalizedProductRecord> {
        let Some(name) = clean_text(raw.name.as_deref()) else {
            debug!("Rejecting {} ({}): no usable product name", raw.id, raw.url);
            return None;
        };

        Some(NormalizedProductRecord {
            id: strip_invisible(&raw.id),
            name,
            url: strip_invisible(&raw.url),
            rating: raw.rating.as_deref().and_then(|r| self.parse_rating(r)),
            image_url: clean_text(raw.image_url.as_deref()),
            dimensions: clean_text(raw.dimensions.as_deref()),
            price: raw.price.as_deref().and_then(|p| self.parse_price(p)),
        })
    }

    /// First numeric token as `f64`.
    pub fn parse_rating(&self, text: &str) -> Option<f64> {
        self.number
            .find(text)
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    /// Currency-stripped, separator-stripped first number, truncated.
    pub fn parse_price(&self, text: &str) -> Option<i64> {
        let mut cleaned = text.replace(',', "");
        for marker in CURRENCY_MARKERS {
            cleaned = cleaned.replace(marker, "");
        }
        self.number
            .find(&cleaned)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(|value| value.trunc() as i64)
    }
}
