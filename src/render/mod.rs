//! Markdown-to-HTML rendering.
//!
//! [`RenderEngine`] wraps comrak and composes the per-block pipeline:
//! GFM conversion, relative-path rewriting against the document's base path,
//! heading-anchor injection for H2/H3, syntax highlighting through the
//! [`Highlighter`](crate::highlight::Highlighter) capability, and lazy-image
//! attribute injection.
//!
//! All per-request state (base path, slug allocation, collected anchors)
//! lives in values created for the call, so one engine instance is safe to
//! reuse for any number of sequential renders.

use std::collections::HashMap;
use std::io::{self, Write};

use comrak::adapters::SyntaxHighlighterAdapter;
use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, Plugins, format_html_with_plugins, parse_document};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::highlight::{Highlighter, default_highlighter};
use crate::paths;

mod anchors;

pub(crate) use anchors::AnchorAdapter;
pub use anchors::{HeadingAnchor, MAX_ANCHOR_LEVEL, MIN_ANCHOR_LEVEL};

/// Rendering configuration, mirroring the converter features the viewer
/// relies on. Defaults enable everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Pass raw HTML in the source through to the output.
    pub allow_html: bool,
    /// Autolink bare URLs.
    pub linkify: bool,
    /// Smart punctuation (quotes, dashes, ellipses).
    pub smart_punctuation: bool,
    /// Add `loading="lazy" decoding="async"` to every image.
    pub lazy_images: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            allow_html: true,
            linkify: true,
            smart_punctuation: true,
            lazy_images: true,
        }
    }
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The rendered HTML fragment.
    pub html: String,
    /// Level-2/3 heading anchors discovered, in document order.
    pub anchors: Vec<HeadingAnchor>,
}

/// Markdown renderer owning the highlighter capability.
pub struct RenderEngine {
    options: RenderOptions,
    highlighter: Box<dyn Highlighter>,
}

impl RenderEngine {
    /// Create an engine with the default (syntect-backed) highlighter.
    pub fn new(options: RenderOptions) -> Self {
        Self::with_highlighter(options, default_highlighter())
    }

    /// Create an engine with an explicit highlighter implementation.
    pub fn with_highlighter(options: RenderOptions, highlighter: Box<dyn Highlighter>) -> Self {
        Self {
            options,
            highlighter,
        }
    }

    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render markdown to HTML, rewriting relative paths against `base_path`
    /// when one is supplied.
    ///
    /// Identical inputs produce identical output; anchor disambiguation is
    /// scoped to this call.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if HTML formatting fails. Per-code-block
    /// highlighting failures do not error; they degrade to escaped text.
    pub fn render(&self, markdown: &str, base_path: Option<&str>) -> Result<Rendered, RenderError> {
        let arena = Arena::new();
        let options = self.comrak_options();
        let root = parse_document(&arena, markdown, &options);

        if let Some(base) = base_path.filter(|base| !base.is_empty()) {
            rewrite_urls(root, base);
        }

        let anchor_adapter = AnchorAdapter::new();
        let code_adapter = CodeBlockAdapter {
            highlighter: self.highlighter.as_ref(),
        };
        let mut plugins = Plugins::default();
        plugins.render.heading_adapter = Some(&anchor_adapter);
        plugins.render.codefence_syntax_highlighter = Some(&code_adapter);

        let mut output = Vec::new();
        format_html_with_plugins(root, &options, &mut output, &plugins)?;
        let mut html = String::from_utf8(output)?;
        if self.options.lazy_images {
            html = inject_lazy_image_attributes(&html);
        }

        Ok(Rendered {
            html,
            anchors: anchor_adapter.into_anchors(),
        })
    }

    /// Render a block, never failing: a rendering error becomes a visible
    /// inline fragment naming the block so one bad block cannot blank out or
    /// abort the rest of the document.
    pub fn render_block(&self, block_id: &str, markdown: &str, base_path: Option<&str>) -> String {
        match self.render(markdown, base_path) {
            Ok(rendered) => rendered.html,
            Err(err) => {
                tracing::error!(block_id, %err, "block rendering failed");
                error_fragment(block_id, &err.to_string())
            }
        }
    }

    /// Run the anchor-generating pass in isolation, returning the anchors a
    /// render of `markdown` would produce.
    pub fn collect_anchors(&self, markdown: &str) -> Vec<HeadingAnchor> {
        self.render(markdown, None)
            .map(|rendered| rendered.anchors)
            .unwrap_or_default()
    }

    fn comrak_options(&self) -> Options {
        let mut options = Options::default();

        // GFM extensions, matching the converter's defaults
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = self.options.linkify;
        options.extension.tasklist = true;
        options.extension.footnotes = true;
        options.extension.superscript = true;
        options.extension.subscript = true;
        options.extension.description_lists = true;
        options.extension.shortcodes = true;

        options.parse.smart = self.options.smart_punctuation;
        options.render.unsafe_ = self.options.allow_html;

        options
    }
}

/// Inline error placeholder shown in the document flow for a failed block.
fn error_fragment(block_id: &str, message: &str) -> String {
    format!(
        "<div class=\"render-error\">Failed to render block {}: {}</div>",
        escape_html(block_id),
        escape_html(message)
    )
}

/// Minimal HTML escaping for text content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Rewrite relative image and link destinations against the base path.
fn rewrite_urls<'a>(node: &'a AstNode<'a>, base_path: &str) {
    match &mut node.data.borrow_mut().value {
        NodeValue::Image(link) | NodeValue::Link(link) => {
            link.url = paths::resolve(&link.url, base_path);
        }
        _ => {}
    }
    for child in node.children() {
        rewrite_urls(child, base_path);
    }
}

/// Mark every image for lazy loading.
fn inject_lazy_image_attributes(html: &str) -> String {
    html.replace("<img ", "<img loading=\"lazy\" decoding=\"async\" ")
}

/// Highlights fenced code through the engine's [`Highlighter`]; unknown or
/// failing languages degrade to HTML-escaped plain text.
struct CodeBlockAdapter<'h> {
    highlighter: &'h dyn Highlighter,
}

impl SyntaxHighlighterAdapter for CodeBlockAdapter<'_> {
    fn write_highlighted(
        &self,
        output: &mut dyn Write,
        lang: Option<&str>,
        code: &str,
    ) -> io::Result<()> {
        let language = lang.map(str::trim).filter(|language| !language.is_empty());
        let highlighted = language
            .filter(|language| self.highlighter.language_known(language))
            .and_then(|language| self.highlighter.highlight(code, language));
        match highlighted {
            Some(html) => output.write_all(html.as_bytes()),
            None => output.write_all(escape_html(code).as_bytes()),
        }
    }

    fn write_pre_tag(
        &self,
        output: &mut dyn Write,
        _attributes: HashMap<String, String>,
    ) -> io::Result<()> {
        output.write_all(b"<pre class=\"hljs\">")
    }

    fn write_code_tag(
        &self,
        output: &mut dyn Write,
        attributes: HashMap<String, String>,
    ) -> io::Result<()> {
        match attributes.get("class") {
            Some(class) => write!(output, "<code class=\"{class}\">"),
            None => output.write_all(b"<code>"),
        }
    }
}
