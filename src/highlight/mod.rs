//! Syntax highlighting for fenced code blocks.
//!
//! Uses syntect with Sublime Text syntax definitions, emitting classed
//! `<span>` markup so the viewer's stylesheet controls the theme. A plain
//! fallback implementation keeps rendering alive when syntect is unavailable
//! or a language is unrecognized.

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::error::EngineError;

/// Capability interface for code-block highlighting.
///
/// `highlight` returns the inner HTML for a `<pre><code>` body, or `None`
/// when the language is unknown or highlighting fails; callers then fall
/// back to escaped plain text. Implementations never panic on bad input.
pub trait Highlighter: Send + Sync {
    /// Whether `language` names a grammar this highlighter understands.
    fn language_known(&self, language: &str) -> bool;

    /// Highlight `code` as `language`, returning classed span markup.
    fn highlight(&self, code: &str, language: &str) -> Option<String>;
}

/// syntect-backed highlighter using the bundled default syntax set.
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
}

impl SyntectHighlighter {
    /// Load the bundled syntax definitions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Highlighter`] if the bundled syntax set is
    /// empty, which would leave every code block unhighlightable.
    pub fn try_new() -> Result<Self, EngineError> {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        if syntax_set.syntaxes().is_empty() {
            return Err(EngineError::Highlighter {
                reason: "no bundled syntax definitions".to_string(),
            });
        }
        Ok(Self { syntax_set })
    }
}

impl Highlighter for SyntectHighlighter {
    fn language_known(&self, language: &str) -> bool {
        self.syntax_set.find_syntax_by_token(language).is_some()
    }

    fn highlight(&self, code: &str, language: &str) -> Option<String> {
        let syntax = self.syntax_set.find_syntax_by_token(language)?;
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::warn!(language, %err, "highlighting failed; falling back to plain text");
                return None;
            }
        }
        Some(generator.finalize())
    }
}

/// Fallback that knows no languages, so every code block degrades to
/// escaped plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn language_known(&self, _language: &str) -> bool {
        false
    }

    fn highlight(&self, _code: &str, _language: &str) -> Option<String> {
        None
    }
}

/// Build the default highlighter, degrading to [`PlainHighlighter`] with a
/// warning if syntect cannot be initialized.
pub fn default_highlighter() -> Box<dyn Highlighter> {
    match SyntectHighlighter::try_new() {
        Ok(highlighter) => Box::new(highlighter),
        Err(err) => {
            tracing::warn!(%err, "syntax highlighting unavailable; code blocks will be plain");
            Box::new(PlainHighlighter)
        }
    }
}
