//! Canonical deduplication keys for failure lines.
//!
//! Volatile substrings break grouping: timestamps differ on every build,
//! and long quoted opaque tokens (credentials, encoded IDs) differ on
//! every run. Both are replaced with fixed placeholders so the same
//! underlying failure always yields the same canonical message.
//!
//! `normalize` is pure, total and idempotent.

use regex::Regex;
use std::sync::LazyLock;

use crate::classifier::TS_LEVEL_PREFIX;

/// Stands in for the stripped `TIMESTAMP [LEVEL]` prefix.
pub const TIMESTAMP_PLACEHOLDER: &str = "[TIMESTAMP]";

/// Stands in for quoted opaque tokens.
pub const OPAQUE_PLACEHOLDER: &str = "[REDACTED]";

/// Quoted run of 50+ token characters: base64ish blobs, signed IDs, keys
static OPAQUE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"][A-Za-z0-9+/=_-]{50,}['"]"#).unwrap());

/// Produce the canonical deduplication key for a failure line.
pub fn normalize(line: &str) -> String {
    let trimmed = line.trim();

    let prefixed = match TS_LEVEL_PREFIX.find(trimmed) {
        Some(m) => {
            let rest = trimmed[m.end()..].trim_start();
            // A colon that separated the timestamp from the message is now
            // orphaned; drop it along with its whitespace.
            let rest = rest.strip_prefix(':').map(str::trim_start).unwrap_or(rest);
            if rest.is_empty() {
                TIMESTAMP_PLACEHOLDER.to_string()
            } else {
                format!("{TIMESTAMP_PLACEHOLDER} {rest}")
            }
        }
        None => trimmed.to_string(),
    };

    OPAQUE_TOKEN
        .replace_all(&prefixed, OPAQUE_PLACEHOLDER)
        .into_owned()
}
