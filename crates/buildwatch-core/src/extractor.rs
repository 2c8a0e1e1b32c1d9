//! Failure line extraction from raw build console logs.
//!
//! Scans backward from the end of the log so the signal closest to the
//! point of failure wins. Two match strategies run in fixed priority
//! order: a strict exception signature pass, then a looser error-keyword
//! pass. Extraction is total; it never fails on any input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Sentinel line returned when no candidate failure line exists.
pub const NO_CLEAR_ERROR: &str = "No clear error found";

/// Jenkins trailer appended after the real cause; excluded from context.
pub const BUILD_FAILURE_MARKER: &str = "Build step 'Execute shell' marked build as failure";

/// Lines containing any of these are stack frames or handler syntax,
/// not the raised exception itself.
const FALSE_POSITIVE_MARKERS: [&str; 8] = [
    "<method",
    "with_traceback",
    "of '",
    "objects>",
    "raise",
    "except",
    "try:",
    "catch",
];

/// Leading `YYYY-MM-DD HH:MM:SS` timestamp on a log line
static TIMESTAMP_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").unwrap());

/// Word-boundary exception signature: `SomeException:` / `SomeError:`
static EXCEPTION_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w*(?:Exception|Error)\s*:").unwrap());

/// Fallback keywords checked when no exception signature matched anywhere
static ERROR_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ERROR:|FATAL:|FAILED|Build step.*failed").unwrap());

/// The single most relevant failure line plus its surrounding context block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Trimmed failure line, or [`NO_CLEAR_ERROR`]
    pub line: String,
    /// Context window ending before the build-failure trailer; may be empty
    pub context: String,
}

impl ExtractionResult {
    /// True when extraction fell through to the sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.line == NO_CLEAR_ERROR
    }
}

/// One pass of the extraction heuristic chain, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// `\b\w*(Exception|Error)\s*:` with false-positive filtering
    ExceptionSignature,
    /// Case-insensitive `ERROR:` / `FATAL:` / `FAILED` / `Build step.*failed`
    ErrorKeyword,
}

impl MatchStrategy {
    /// Whether this strategy accepts `line` as the failure line.
    ///
    /// Ignore-list entries are case-sensitive substrings checked against
    /// the raw candidate line before any normalization.
    pub fn accepts(&self, line: &str, ignore_list: &[String]) -> bool {
        let matched = match self {
            MatchStrategy::ExceptionSignature => {
                EXCEPTION_SIGNATURE.is_match(line)
                    && !FALSE_POSITIVE_MARKERS.iter().any(|m| line.contains(m))
            }
            MatchStrategy::ErrorKeyword => ERROR_KEYWORD.is_match(line),
        };
        matched && !ignore_list.iter().any(|p| line.contains(p))
    }
}

/// Extract the most relevant failure line and its context from a build log.
///
/// Total over arbitrary input; returns the [`NO_CLEAR_ERROR`] sentinel with
/// empty context when nothing in the log looks like a failure.
pub fn extract(log_text: &str, ignore_list: &[String]) -> ExtractionResult {
    let lines: Vec<&str> = log_text.trim().lines().collect();

    // Last timestamped line anywhere in the log
    let latest_timestamp = lines.iter().rposition(|l| TIMESTAMP_LINE.is_match(l));

    for strategy in [MatchStrategy::ExceptionSignature, MatchStrategy::ErrorKeyword] {
        if let Some(hit) = lines.iter().rposition(|l| strategy.accepts(l, ignore_list)) {
            return ExtractionResult {
                line: lines[hit].trim().to_string(),
                context: context_window(&lines, hit, latest_timestamp),
            };
        }
    }

    ExtractionResult {
        line: NO_CLEAR_ERROR.to_string(),
        context: String::new(),
    }
}

/// Context window around the hit line.
///
/// Anchored at the nearest timestamp line at or before the hit. When the
/// latest timestamp in the log falls after the hit, re-scan backward from
/// the hit so the window never starts past the failure line. Without any
/// usable timestamp, fall back to ten lines of lead-in. The window ends
/// before the first build-failure trailer at or after the anchor.
fn context_window(lines: &[&str], hit: usize, latest_timestamp: Option<usize>) -> String {
    let anchor = match latest_timestamp {
        Some(ts) if ts <= hit => Some(ts),
        _ => lines[..hit].iter().rposition(|l| TIMESTAMP_LINE.is_match(l)),
    };
    let start = anchor.unwrap_or_else(|| hit.saturating_sub(10));

    let end = lines[start..]
        .iter()
        .position(|l| l.contains(BUILD_FAILURE_MARKER))
        .map(|offset| start + offset)
        .unwrap_or(lines.len());

    lines[start..end].join("\n")
}
