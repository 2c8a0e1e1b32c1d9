//! Shared analysis engine for Buildwatch.
//!
//! Pure string/regex computation over already-fetched CI build logs:
//! failure-line extraction, category classification, canonical-message
//! normalization and per-run aggregation. No I/O, no async, no globals;
//! everything here is total and deterministic so the run loop can trust
//! it with arbitrary log content.

pub mod aggregate;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod normalizer;

pub use aggregate::{AggregationStore, FailureReport};
pub use engine::{BuildAnalysis, TriageEngine};
pub use error::TriageError;
