//! Heading slug generation.
//!
//! Slugs are normalized, identifier-safe strings derived from heading text,
//! prefixed with `heading-` so they never collide with other DOM id namespaces.

use std::collections::HashSet;

/// Fallback used when normalization leaves nothing behind.
const EMPTY_FALLBACK: &str = "untitled-section";

/// Namespace prefix for all heading anchor ids.
pub const ANCHOR_PREFIX: &str = "heading-";

/// Generate a heading anchor id from heading text.
///
/// Lowercases the input, replaces whitespace runs and literal periods with a
/// single hyphen, strips everything outside `[A-Za-z0-9_-]`, collapses hyphen
/// runs, and trims leading/trailing hyphens. Empty results become
/// `heading-untitled-section`.
///
/// # Examples
///
/// ```
/// use blockmark::slug::slug;
///
/// assert_eq!(slug("Getting Started!!"), "heading-getting-started");
/// assert_eq!(slug("A.B  C"), "heading-a-b-c");
/// assert_eq!(slug(""), "heading-untitled-section");
/// ```
pub fn slug(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut last_hyphen = false;
    for ch in text.chars() {
        if ch.is_whitespace() || ch == '.' || ch == '-' {
            if !last_hyphen {
                normalized.push('-');
                last_hyphen = true;
            }
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            normalized.push(ch.to_ascii_lowercase());
            last_hyphen = false;
        }
        // Anything else is stripped without breaking a hyphen run.
    }

    let trimmed = normalized.trim_matches('-');
    let body = if trimmed.is_empty() {
        EMPTY_FALLBACK
    } else {
        trimmed
    };
    format!("{ANCHOR_PREFIX}{body}")
}

/// Assigns unique slugs within a single render/split pass.
///
/// Duplicate headings get a numeric suffix in document order: the first
/// `## Setup` keeps `heading-setup`, the second becomes `heading-setup-2`,
/// the third `heading-setup-3`, and so on. Generated ids are reserved, so a
/// later heading that literally normalizes to `heading-setup-2` is itself
/// disambiguated rather than colliding.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    taken: HashSet<String>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next unique anchor id for `text`.
    pub fn assign(&mut self, text: &str) -> String {
        let base = slug(text);
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut suffix = 2usize;
        loop {
            let candidate = format!("{base}-{suffix}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_strips_punctuation() {
        assert_eq!(slug("Getting Started!!"), "heading-getting-started");
    }

    #[test]
    fn test_slug_empty_input_falls_back() {
        assert_eq!(slug(""), "heading-untitled-section");
        assert_eq!(slug("!!!"), "heading-untitled-section");
        assert_eq!(slug("   "), "heading-untitled-section");
    }

    #[test]
    fn test_slug_periods_become_hyphens() {
        assert_eq!(slug("A.B  C"), "heading-a-b-c");
    }

    #[test]
    fn test_slug_lowercases() {
        assert_eq!(slug("Chapter ONE"), "heading-chapter-one");
    }

    #[test]
    fn test_slug_preserves_underscores_and_digits() {
        assert_eq!(slug("step_2 of 3"), "heading-step_2-of-3");
    }

    #[test]
    fn test_slug_collapses_hyphen_runs() {
        assert_eq!(slug("a -- b"), "heading-a-b");
        assert_eq!(slug("--a--"), "heading-a");
    }

    #[test]
    fn test_slug_unicode_is_stripped() {
        assert_eq!(slug("café"), "heading-caf");
    }

    #[test]
    fn test_allocator_first_occurrence_keeps_bare_slug() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.assign("Setup"), "heading-setup");
    }

    #[test]
    fn test_allocator_duplicates_get_numeric_suffixes() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.assign("Setup"), "heading-setup");
        assert_eq!(slugs.assign("Setup"), "heading-setup-2");
        assert_eq!(slugs.assign("Setup"), "heading-setup-3");
    }

    #[test]
    fn test_allocator_reserves_generated_suffixes() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.assign("Setup"), "heading-setup");
        assert_eq!(slugs.assign("Setup"), "heading-setup-2");
        // A literal "Setup 2" heading normalizes to the already-issued id.
        assert_eq!(slugs.assign("Setup 2"), "heading-setup-2-2");
    }

    #[test]
    fn test_allocator_is_per_pass() {
        let mut first = SlugAllocator::new();
        let mut second = SlugAllocator::new();
        assert_eq!(first.assign("Intro"), second.assign("Intro"));
    }
}
