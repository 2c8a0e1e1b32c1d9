//! Failure category derivation from an extracted failure line.
//!
//! Total over arbitrary input: `"Unknown"` only for an empty line,
//! `"BuildFailure"` as the ultimate fallback.

use regex::Regex;
use std::sync::LazyLock;

/// Category for a line that carried no usable text.
pub const CATEGORY_UNKNOWN: &str = "Unknown";

/// Fallback category when nothing in the line names an error type.
pub const CATEGORY_BUILD_FAILURE: &str = "BuildFailure";

/// Leading `TIMESTAMP [LEVEL] [separator]` prefix shared with the normalizer.
/// Matches `2024-01-01 10:00:00.123 | ERROR | ` and its sparser variants.
pub(crate) static TS_LEVEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:[.,]\d+)?\s*(?:\|\s*)?(?:INFO|ERROR|WARN|DEBUG|FATAL|TRACE)?\s*(?:\|\s*)?",
    )
    .unwrap()
});

/// Dotted identifier ending in Exception/Error/Warning, followed by a colon
static EXCEPTION_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*(?:Exception|Error|Warning))\s*:").unwrap()
});

const ERROR_KEYWORDS: [&str; 4] = ["error", "exception", "failed", "fatal"];

/// Derive a short grouping category from a failure line.
pub fn classify(line: &str) -> String {
    if line.is_empty() {
        return CATEGORY_UNKNOWN.to_string();
    }

    let stripped = TS_LEVEL_PREFIX.replace(line, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return CATEGORY_UNKNOWN.to_string();
    }

    // Exact exception signature wins: "myapp.utils.MyCustomException: boom"
    if let Some(captures) = EXCEPTION_TYPE.captures(stripped) {
        return captures[1].to_string();
    }

    // Otherwise look at whatever precedes the first colon
    if let Some((head, _)) = stripped.split_once(':') {
        let head = head.trim();

        if head.contains('.')
            && (head.ends_with("Exception") || head.ends_with("Error") || head.ends_with("Warning"))
        {
            return head.to_string();
        }

        // Single capitalized token like "Traceback" or "AssertionFailed"
        if head.split_whitespace().count() == 1
            && head.chars().next().is_some_and(|c| c.is_uppercase())
            && head.len() > 3
        {
            return head.to_string();
        }
    }

    // First token, kept only if it smells like an error
    let first_word = stripped.split_whitespace().next().unwrap_or(CATEGORY_UNKNOWN);
    let lower = first_word.to_lowercase();
    if ERROR_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return first_word.to_string();
    }

    CATEGORY_BUILD_FAILURE.to_string()
}
