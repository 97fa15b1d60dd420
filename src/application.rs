//! Application layer
//!
//! Orchestrates the domain services over the infrastructure: search
//! pagination, product extraction, the per-query harvest run, and the
//! combined-store rebuild and cleanup passes.

pub mod aggregator;
pub mod cleanup;
pub mod detail_extraction;
pub mod harvest_pipeline;
pub mod link_discovery;

pub use aggregator::{AggregationReport, rebuild};
pub use cleanup::{CleanupKind, CleanupPass, CleanupReport, CleanupRunner};
pub use detail_extraction::DetailExtractor;
pub use harvest_pipeline::{HarvestPipeline, HarvestReport, QueryReport};
pub use link_discovery::LinkDiscoverer;
