//! Heading anchor injection.
//!
//! Level-2 and level-3 headings get a stable anchor id and render as a
//! clickable self-link, so the table of contents and deep links can target a
//! block's subsections. Other heading levels render untouched.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use comrak::adapters::{HeadingAdapter, HeadingMeta};
use comrak::nodes::Sourcepos;

use crate::slug::SlugAllocator;

/// Lowest heading level that receives an anchor.
pub const MIN_ANCHOR_LEVEL: u8 = 2;
/// Highest heading level that receives an anchor.
pub const MAX_ANCHOR_LEVEL: u8 = 3;

/// An anchor discovered while rendering, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingAnchor {
    /// Unique anchor id (`heading-…`), disambiguated within the pass.
    pub id: String,
    /// Heading level, always 2 or 3.
    pub level: u8,
}

/// Comrak heading adapter that assigns anchor ids for one render pass.
///
/// One adapter per `render` call: slug disambiguation is scoped to a single
/// pass, and the anchors collected here are returned alongside the HTML.
pub(crate) struct AnchorAdapter {
    slugs: Mutex<SlugAllocator>,
    collected: Mutex<Vec<HeadingAnchor>>,
}

impl AnchorAdapter {
    pub(crate) fn new() -> Self {
        Self {
            slugs: Mutex::new(SlugAllocator::new()),
            collected: Mutex::new(Vec::new()),
        }
    }

    /// Anchors discovered during the pass, in document order.
    pub(crate) fn into_anchors(self) -> Vec<HeadingAnchor> {
        self.collected
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    const fn anchored(level: u8) -> bool {
        MIN_ANCHOR_LEVEL <= level && level <= MAX_ANCHOR_LEVEL
    }
}

impl HeadingAdapter for AnchorAdapter {
    fn enter(
        &self,
        output: &mut dyn Write,
        heading: &HeadingMeta,
        _sourcepos: Option<Sourcepos>,
    ) -> io::Result<()> {
        if Self::anchored(heading.level) {
            let id = self
                .slugs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .assign(&heading.content);
            self.collected
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(HeadingAnchor {
                    id: id.clone(),
                    level: heading.level,
                });
            write!(
                output,
                "<h{} id=\"{id}\"><a class=\"header-anchor\" href=\"#{id}\">",
                heading.level
            )
        } else {
            write!(output, "<h{}>", heading.level)
        }
    }

    fn exit(&self, output: &mut dyn Write, heading: &HeadingMeta) -> io::Result<()> {
        if Self::anchored(heading.level) {
            write!(output, "</a></h{}>", heading.level)
        } else {
            write!(output, "</h{}>", heading.level)
        }
    }
}
