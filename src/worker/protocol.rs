//! Message protocol between callers and render workers.
//!
//! Payloads are JSON-serializable, tagged by a `type` field. Every request
//! carries a caller-supplied correlation id that is echoed back verbatim, and
//! every block response echoes the originating block id, so callers can match
//! completions however they arrive.

use serde::{Deserialize, Serialize};

use crate::splitter::Block;

/// Caller → worker messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Split a full document into blocks.
    SplitText {
        request_id: u64,
        markdown_text: String,
    },
    /// Render one block to HTML, rewriting relative paths against
    /// `base_path` when present.
    ParseBlock {
        request_id: u64,
        markdown_block: Block,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_path: Option<String>,
    },
}

impl Request {
    /// The correlation id the response must echo.
    pub const fn request_id(&self) -> u64 {
        match self {
            Self::SplitText { request_id, .. } | Self::ParseBlock { request_id, .. } => *request_id,
        }
    }
}

/// Worker → caller messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Emitted exactly once, after initialization succeeds.
    WorkerReady,
    /// Answer to [`Request::SplitText`].
    BlocksSplitted {
        request_id: u64,
        blocks: Vec<Block>,
    },
    /// Answer to [`Request::ParseBlock`].
    BlockParsed {
        request_id: u64,
        html: String,
        original_id: String,
    },
    /// Initialization, request, or protocol failure. `request_id` and
    /// `original_id` are present when the failure is tied to a request.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<u64>,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        original_id: Option<String>,
    },
}
