//! Domain module - product records and the pure transformations over them
//!
//! Nothing in here performs I/O. The normalizer and deduplicator are plain
//! functions over owned records, so they are shared by the harvest pipeline,
//! the aggregator and the benchmarks.

pub mod category;
pub mod product;
pub mod services;

pub use product::{
    CandidateLink, CombinedDatasetEntry, NormalizedProductRecord, RawProductRecord, SearchQuery,
};
pub use services::{Normalizer, ProductFingerprint, dedupe};
