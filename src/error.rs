//! Error taxonomy for the rendering pipeline.
//!
//! Only initialization failures are fatal to a worker. Everything else is
//! recovered in place: a failed block renders as an inline error fragment, a
//! bad relative path falls back to the raw path, and a malformed protocol
//! message is answered with a generic error response.

use thiserror::Error;

/// Fatal construction failure: the engine (or an injected replacement) could
/// not be built. A worker hitting this transitions to `Failed` and answers
/// every subsequent request with an error response.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("highlighter initialization failed: {reason}")]
    Highlighter { reason: String },

    #[error("renderer initialization failed: {reason}")]
    Renderer { reason: String },
}

/// A single block's conversion failed. Recovered locally by the caller;
/// never aborts other blocks.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to format html: {0}")]
    Format(#[from] std::io::Error),

    #[error("renderer produced invalid utf-8: {0}")]
    InvalidOutput(#[from] std::string::FromUtf8Error),
}

/// Caller-side worker communication failure.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker is no longer running")]
    Disconnected,

    #[error("timed out waiting for a worker response")]
    Timeout,

    #[error("worker failed to initialize: {message}")]
    InitializationFailed { message: String },
}
