//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors and id patterns per site. Every list is an
//! ordered fallback chain: newer layouts first, legacy layouts after.

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// How a discovered product URL is formed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStyle {
    /// Built from the id: `{base_url}` + template with `{id}` replaced
    Canonical { path_template: String },
    /// The result anchor's `href`, resolved against the base URL
    Href,
}

/// Selectors for search result pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListSelectors {
    /// Result containers carrying the product id as an attribute
    pub container: Vec<String>,

    /// Attribute on the container holding the id
    pub container_id_attr: String,

    /// Anchor inside the container pointing at the product page
    pub container_link: Vec<String>,

    /// Ids that don't match this are ignored (empty = accept all)
    pub valid_id_pattern: Option<String>,

    /// Anchors scanned when containers don't yield enough ids
    pub anchor: Vec<String>,

    /// Pattern with one capture group pulling the id from an anchor href
    pub anchor_id_pattern: String,

    /// How product URLs are built
    pub link_style: LinkStyle,
}

impl ProductListSelectors {
    pub fn amazon() -> Self {
        Self {
            container: strings(&["[data-asin]"]),
            container_id_attr: "data-asin".to_string(),
            container_link: Vec::new(),
            valid_id_pattern: Some(r"^[A-Z0-9]{8,}$".to_string()),
            anchor: strings(&["a[href*='/dp/']"]),
            anchor_id_pattern: r"/dp/([A-Z0-9]{8,})".to_string(),
            link_style: LinkStyle::Canonical {
                path_template: "/dp/{id}".to_string(),
            },
        }
    }

    pub fn flipkart() -> Self {
        Self {
            container: strings(&["div[data-id]"]),
            container_id_attr: "data-id".to_string(),
            container_link: strings(&["a[href]"]),
            valid_id_pattern: None,
            anchor: strings(&["a[href*='/p/itm']"]),
            anchor_id_pattern: r"/p/(itm[a-zA-Z0-9]+)".to_string(),
            link_style: LinkStyle::Href,
        }
    }
}

/// Selectors for product detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetailSelectors {
    /// Site title elements; a generic `h1` is tried after these
    pub title: Vec<String>,

    /// Rating widget text
    pub rating: Vec<String>,

    /// Price widgets in priority order
    pub price: Vec<String>,

    /// Primary image element
    pub image: Vec<String>,

    /// Attributes read from the primary image, in order
    pub image_attributes: Vec<String>,

    /// Specification tables / bullet lists searched for a dimension label
    pub spec_containers: Vec<String>,

    /// Row labels that introduce a dimension value
    pub dimension_labels: Vec<String>,

    /// Generic rows scanned by the dimension heuristic
    pub generic_rows: Vec<String>,

    /// Pattern with one capture group pulling the id from a product URL
    pub detail_id_pattern: String,

    /// Canonical product path with `{id}`; `None` keeps URLs as discovered
    pub canonical_path: Option<String>,
}

impl ProductDetailSelectors {
    pub fn amazon() -> Self {
        Self {
            title: strings(&["#productTitle", "span#title"]),
            rating: strings(&["span.a-icon-alt", "#acrPopover"]),
            price: strings(&[
                "#priceblock_ourprice",
                "#priceblock_dealprice",
                "span.a-price > span.a-offscreen",
                "span.a-price-whole",
            ]),
            image: strings(&["#imgTagWrapperId img", "#landingImage", "img#imgBlkFront"]),
            image_attributes: strings(&["data-old-hires", "data-a-dynamic-image", "src"]),
            spec_containers: strings(&[
                "#productDetails_techSpec_section_1",
                "#productDetails_detailBullets_sections1",
                "#productDetailsTable",
                "#detailBullets_feature_div",
                "#technicalSpecifications_feature_div",
            ]),
            dimension_labels: strings(&[
                "Product Dimensions",
                "Item Dimensions",
                "Package Dimensions",
                "Dimensions",
            ]),
            generic_rows: strings(&["tr", "li"]),
            detail_id_pattern: r"/dp/([A-Z0-9]{8,})".to_string(),
            canonical_path: Some("/dp/{id}".to_string()),
        }
    }

    pub fn flipkart() -> Self {
        Self {
            title: strings(&["span.B_NuCI", "span.VU-ZEz"]),
            rating: strings(&["div._3LWZlK", "div.XQDdHH"]),
            price: strings(&["div.Nx9bqj", "div.hZ3P6w", "div._30jeq3._16Jk6d", "div._30jeq3"]),
            image: strings(&["img.xD43kG", "img.DByuf4", "img.UCc1lI", "img._396cs4", "img.q6DClP"]),
            image_attributes: strings(&["src"]),
            spec_containers: strings(&["div._14cfVK"]),
            dimension_labels: strings(&["Dimensions", "Product Dimensions"]),
            generic_rows: strings(&["div.row", "tr"]),
            detail_id_pattern: r"/(itm[a-zA-Z0-9]+)".to_string(),
            canonical_path: None,
        }
    }
}
