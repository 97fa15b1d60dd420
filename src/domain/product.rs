//! Product records as they move through the harvest pipeline
//!
//! Raw → Normalized → CombinedDatasetEntry. Missing values are `None` all the
//! way through; the literal `"NA"` only appears when a record is written out.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Marker written for a missing dimension string in stored files.
pub const NOT_AVAILABLE: &str = "NA";

/// One search query with its collection target and rating floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub target: usize,
    pub min_rating: f64,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, target: usize, min_rating: f64) -> Self {
        Self {
            text: text.into(),
            target,
            min_rating,
        }
    }
}

/// A product found on a search page: site-scoped id plus canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateLink {
    pub id: String,
    pub url: String,
}

impl CandidateLink {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Fields exactly as read from a product page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProductRecord {
    pub id: String,
    pub url: String,
    pub name: Option<String>,
    pub rating: Option<String>,
    pub price: Option<String>,
    pub dimensions: Option<String>,
    pub image_url: Option<String>,
}

/// Typed, canonical product record; this is the per-query store schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProductRecord {
    #[serde(rename = "Product ID")]
    pub id: String,
    #[serde(rename = "Product Name")]
    pub name: String,
    #[serde(rename = "Product URL")]
    pub url: String,
    #[serde(rename = "Rating", default, deserialize_with = "lenient::rating")]
    pub rating: Option<f64>,
    #[serde(rename = "Image URL", default, deserialize_with = "lenient::text")]
    pub image_url: Option<String>,
    #[serde(
        rename = "Dimensions",
        default,
        serialize_with = "na_string::serialize",
        deserialize_with = "na_string::deserialize"
    )]
    pub dimensions: Option<String>,
    #[serde(rename = "Price", default, deserialize_with = "lenient::price")]
    pub price: Option<i64>,
}

/// A combined-dataset row: the normalized record plus ID and categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedDatasetEntry {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(
        rename = "Dimension",
        serialize_with = "na_string::serialize",
        deserialize_with = "na_string::deserialize"
    )]
    pub dimension: Option<String>,
    #[serde(rename = "Price", deserialize_with = "lenient::price")]
    pub price: Option<i64>,
    #[serde(rename = "Rating", deserialize_with = "lenient::rating")]
    pub rating: Option<f64>,
    #[serde(rename = "Type")]
    pub category: String,
    #[serde(rename = "SubType")]
    pub subcategory: String,
    #[serde(rename = "ProductURL")]
    pub product_url: String,
    #[serde(rename = "ImageURL", deserialize_with = "lenient::text")]
    pub image_url: Option<String>,
}

impl CombinedDatasetEntry {
    /// Column order of the tabular projection.
    pub const COLUMNS: [&'static str; 9] = [
        "ID",
        "Name",
        "Dimension",
        "Price",
        "Rating",
        "Type",
        "SubType",
        "ProductURL",
        "ImageURL",
    ];

    /// Sequential dataset ID, e.g. `A-0001`.
    pub fn format_id(prefix: &str, counter: usize) -> String {
        format!("{prefix}-{counter:04}")
    }
}

/// `None` <-> `"NA"` at the storage boundary.
mod na_string {
    use super::{Deserialize, Deserializer, Serializer, NOT_AVAILABLE};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(NOT_AVAILABLE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|v| {
            let trimmed = v.trim();
            !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(NOT_AVAILABLE)
        }))
    }
}

/// Older stores wrote numbers as strings, `0` for a missing rating and
/// `"NA"` for missing text; read all of those back as typed options.
mod lenient {
    use super::{Deserialize, Deserializer, NOT_AVAILABLE};
    use serde_json::Value;

    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(as_f64(&value).filter(|r| *r > 0.0))
    }

    pub fn price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(as_f64(&value).map(|p| p.trunc() as i64))
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|v| !v.trim().is_empty() && v.trim() != NOT_AVAILABLE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NormalizedProductRecord {
        NormalizedProductRecord {
            id: "B0ABCDEF12".into(),
            name: "Oak Study Table".into(),
            url: "https://www.amazon.in/dp/B0ABCDEF12".into(),
            rating: Some(4.3),
            image_url: None,
            dimensions: None,
            price: Some(12345),
        }
    }

    #[test]
    fn missing_dimensions_are_written_as_na() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["Dimensions"], "NA");
        assert_eq!(json["Image URL"], serde_json::Value::Null);
        assert_eq!(json["Product Name"], "Oak Study Table");
    }

    #[test]
    fn stored_record_reads_back_to_the_same_value() {
        let original = record();
        let json = serde_json::to_string(&original).unwrap();
        let back: NormalizedProductRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn legacy_values_are_read_leniently() {
        let legacy = r#"{
            "Product ID": "itm123",
            "Product Name": "Sofa",
            "Product URL": "https://www.flipkart.com/p/itm123",
            "Rating": 0,
            "Image URL": "NA",
            "Dimensions": "NA",
            "Price": "14999"
        }"#;
        let parsed: NormalizedProductRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.rating, None);
        assert_eq!(parsed.image_url, None);
        assert_eq!(parsed.dimensions, None);
        assert_eq!(parsed.price, Some(14999));
    }

    #[test]
    fn dataset_ids_are_zero_padded() {
        assert_eq!(CombinedDatasetEntry::format_id("A", 1), "A-0001");
        assert_eq!(CombinedDatasetEntry::format_id("F", 321), "F-0321");
        assert_eq!(CombinedDatasetEntry::format_id("F", 12345), "F-12345");
    }
}
