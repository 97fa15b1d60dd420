//! Domain services
//!
//! Record-level logic that doesn't belong on the record types themselves.

pub mod deduplicator;
pub mod normalizer;

pub use deduplicator::{ProductFingerprint, dedupe};
pub use normalizer::{Normalizer, collapse_whitespace, strip_invisible};
