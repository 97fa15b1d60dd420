//! Product Harvester - resilient e-commerce product collection
//!
//! Discovers products from storefront search results, extracts them from
//! drifting page layouts with ordered fallback strategies, normalizes and
//! deduplicates the records, and aggregates per-query files into a combined
//! dataset with backup-guarded cleanup passes.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{HarvestError, HarvestResult};
