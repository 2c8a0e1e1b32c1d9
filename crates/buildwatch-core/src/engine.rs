//! Per-build analysis pipeline.
//!
//! Wires extraction, classification and normalization into a single call.
//! Configuration (the ignore list) is explicit and construction-time;
//! there is no process-global state.

use serde::{Deserialize, Serialize};

use crate::classifier;
use crate::extractor::{self, ExtractionResult};
use crate::normalizer;

/// Everything the run loop needs from one build's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAnalysis {
    /// The extracted failure line (or the sentinel)
    pub line: String,
    /// Bounded context block around the failure line
    pub context: String,
    /// Grouping category derived from the line
    pub category: String,
    /// Canonical deduplication key derived from the line
    pub canonical_message: String,
}

/// The extraction/classification/normalization engine for one run.
#[derive(Debug, Clone, Default)]
pub struct TriageEngine {
    ignore_patterns: Vec<String>,
}

impl TriageEngine {
    /// Engine with the given case-sensitive ignore substrings.
    pub fn new(ignore_patterns: Vec<String>) -> Self {
        Self { ignore_patterns }
    }

    /// Run the full per-build pipeline over an in-memory log.
    ///
    /// Total: any input, including empty or binary-looking text, yields a
    /// defined analysis. No I/O, no blocking.
    pub fn analyze(&self, log_text: &str) -> BuildAnalysis {
        let ExtractionResult { line, context } =
            extractor::extract(log_text, &self.ignore_patterns);
        let category = classifier::classify(&line);
        let canonical_message = normalizer::normalize(&line);
        BuildAnalysis {
            line,
            context,
            category,
            canonical_message,
        }
    }
}
