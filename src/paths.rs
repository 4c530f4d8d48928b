//! Relative path rewriting for rendered documents.
//!
//! Rendered HTML refers to images and linked documents by paths relative to
//! the markdown file that mentioned them. The viewer serves everything from a
//! single document root, so relative paths are rebased onto the document's
//! storage directory before they reach the page.

use once_cell::sync::Lazy;
use regex::Regex;

/// Paths that must never be rewritten: URLs with a scheme,
/// protocol-relative (`//`), root-relative (`/`), fragment-only (`#`),
/// and data URIs.
static PASSTHROUGH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:[a-z]+:|//|/|#|data:)").expect("passthrough pattern"));

/// Returns true if `path` should be left untouched by [`resolve`].
pub fn is_passthrough(path: &str) -> bool {
    PASSTHROUGH.is_match(path)
}

/// Resolve `raw_path` against `base_path` treated as a directory.
///
/// The result is relative to the document root: no leading separator,
/// duplicate separators collapsed, `.` segments dropped, and `..` segments
/// popped (clamped at the root, like URL resolution). Passthrough paths and
/// anything that fails to resolve come back unchanged; resolution failures
/// are reported through the log side channel, never to the caller.
pub fn resolve(raw_path: &str, base_path: &str) -> String {
    if raw_path.is_empty() || base_path.is_empty() || is_passthrough(raw_path) {
        return raw_path.to_string();
    }

    // Treat the base as a directory: a trailing separator means its last
    // segment is kept, exactly as URL resolution would.
    let mut segments: Vec<&str> = Vec::new();
    let combined = format!("{}/{raw_path}", base_path.trim_end_matches('/'));
    for segment in combined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Clamped at the document root.
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        tracing::warn!(raw_path, base_path, "relative path resolved to nothing; keeping raw path");
        return raw_path.to_string();
    }
    segments.join("/")
}
