// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. worker::WorkerHandle)
    clippy::module_name_repetitions
)]

//! # Blockmark
//!
//! Incremental block-based markdown rendering for document viewers.
//!
//! Blockmark splits a markdown document into independently renderable blocks,
//! converts each block to HTML on a dedicated worker thread, and tracks
//! heading anchors so navigation can jump straight to a block's subsection:
//!
//! - Blocks open at H1/H2 headings and multi-blank-line runs, never inside a
//!   code fence
//! - H2/H3 headings get stable, unique `heading-…` anchor ids rendered as
//!   clickable permalinks
//! - Relative image and link paths are rebased onto the document's storage
//!   directory
//! - Code blocks are syntax-highlighted, degrading to escaped plain text for
//!   unknown languages
//!
//! ## Modules
//!
//! - [`splitter`]: Document segmentation into blocks
//! - [`render`]: Markdown-to-HTML conversion pipeline
//! - [`worker`]: Off-thread rendering with an asynchronous message protocol
//! - [`slug`]: Heading anchor id generation
//! - [`paths`]: Relative path rewriting
//! - [`highlight`]: Syntax highlighting capability
//! - [`error`]: Failure taxonomy

pub mod error;
pub mod highlight;
pub mod paths;
pub mod render;
pub mod slug;
pub mod splitter;
pub mod worker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::render::{RenderEngine, RenderOptions, Rendered};
    pub use crate::splitter::{Block, BlockSplitter};
    pub use crate::worker::{RenderWorker, Request, Response, WorkerHandle, WorkerState};
}
