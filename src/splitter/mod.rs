//! Document segmentation into independently renderable blocks.
//!
//! A block boundary opens immediately before a level-1 or level-2 heading
//! line, or at a run of two or more fully blank lines, whichever comes first.
//! Fenced code blocks suppress both boundary kinds so a fence is never
//! truncated mid-block. Candidates are trimmed; empty and horizontal-rule-only
//! candidates are dropped, and non-empty input that yields nothing becomes a
//! single whole-document block.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::render::RenderEngine;

/// A contiguous, independently renderable segment of a document.
///
/// Ids are unique within a process but stable only for one splitting pass;
/// re-splitting the same document produces fresh ids, so callers must not
/// persist them across splits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Unique identifier for this pass.
    pub id: String,
    /// Trimmed, non-empty markdown source of the block.
    pub markdown: String,
    /// Level-2/3 heading anchor ids inside this block, in document order.
    pub contained_heading_ids: Vec<String>,
}

/// Splits documents into [`Block`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockSplitter;

impl BlockSplitter {
    pub fn new() -> Self {
        Self
    }

    /// Split `markdown` into ordered blocks, populating each block's
    /// contained heading ids via the engine's isolated anchor pass.
    pub fn split(&self, engine: &RenderEngine, markdown: &str) -> Vec<Block> {
        segment(markdown)
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let contained_heading_ids = engine
                    .collect_anchors(&text)
                    .into_iter()
                    .map(|anchor| anchor.id)
                    .collect();
                Block {
                    id: next_block_id(index),
                    markdown: text,
                    contained_heading_ids,
                }
            })
            .collect()
    }
}

/// Number of consecutive blank lines that open a block boundary.
const BLANK_RUN_BOUNDARY: usize = 2;

/// Cut `markdown` into trimmed, non-empty segments.
fn segment(markdown: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut pending_blanks = 0usize;
    let mut fence: Option<Fence> = None;

    for line in markdown.lines() {
        if let Some(open) = &fence {
            // Inside a fence every line is content, blank or not.
            let closes = open.closes(line);
            current.push(line);
            if closes {
                fence = None;
            }
            continue;
        }

        if line.trim().is_empty() {
            pending_blanks += 1;
            continue;
        }

        if pending_blanks >= BLANK_RUN_BOUNDARY || is_boundary_heading(line) {
            flush(&mut segments, &mut current);
        } else if pending_blanks == 1 && !current.is_empty() {
            // A single blank line is an ordinary separator within the block.
            current.push("");
        }
        pending_blanks = 0;

        if let Some(open) = Fence::open(line) {
            fence = Some(open);
        }
        current.push(line);
    }
    flush(&mut segments, &mut current);

    if segments.is_empty() && !markdown.trim().is_empty() {
        // Fallback invariant: no input is ever silently dropped.
        segments.push(markdown.trim().to_string());
    }
    segments
}

fn flush(segments: &mut Vec<String>, current: &mut Vec<&str>) {
    let text = current.join("\n");
    current.clear();
    let trimmed = text.trim();
    if trimmed.is_empty() || is_horizontal_rule(trimmed) {
        return;
    }
    segments.push(trimmed.to_string());
}

/// Lines that open a boundary: un-indented ATX headings of level 1 or 2.
fn is_boundary_heading(line: &str) -> bool {
    let hashes = line.len() - line.trim_start_matches('#').len();
    matches!(hashes, 1 | 2)
        && line[hashes..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
}

/// A candidate consisting solely of a horizontal-rule marker.
fn is_horizontal_rule(text: &str) -> bool {
    let compact: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    compact.len() >= 3
        && (compact.chars().all(|ch| ch == '-')
            || compact.chars().all(|ch| ch == '*')
            || compact.chars().all(|ch| ch == '_'))
}

/// Open code fence state: marker character and opening run length.
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next()?;
        if marker != '`' && marker != '~' {
            return None;
        }
        let len = trimmed.chars().take_while(|&ch| ch == marker).count();
        (len >= 3).then_some(Self { marker, len })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let run = trimmed.chars().take_while(|&ch| ch == self.marker).count();
        run >= self.len && trimmed[run..].trim().is_empty()
    }
}

/// Process-unique seed, so ids from different processes never collide.
fn process_seed() -> u64 {
    static SEED: OnceLock<u64> = OnceLock::new();
    *SEED.get_or_init(|| RandomState::new().build_hasher().finish())
}

/// Monotonic serial shared by every split in the process; combined with the
/// per-pass index this keeps ids unique without relying on wall-clock time.
fn next_block_id(index: usize) -> String {
    static SERIAL: AtomicU64 = AtomicU64::new(0);
    let serial = SERIAL.fetch_add(1, Ordering::Relaxed);
    format!("block-{index}-{:016x}-{serial}", process_seed())
}
