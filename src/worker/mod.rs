//! Off-thread rendering worker.
//!
//! A [`RenderWorker`] owns one [`RenderEngine`] and one [`BlockSplitter`] on a
//! dedicated thread with its own request queue, communicating with the caller
//! purely through message passing. Lifecycle:
//!
//! ```text
//! Uninitialized → Initializing → Ready | Failed
//! ```
//!
//! `worker_ready` is emitted exactly once after a successful transition to
//! `Ready`. Requests sent before readiness queue in the channel and are
//! answered once initialization settles — a worker never silently drops a
//! request. If initialization fails, one `error` is emitted and every request
//! (queued or later) short-circuits to an error response. Dropping the handle
//! closes the queue and ends the thread.

mod protocol;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub use protocol::{Request, Response};

use crate::error::{EngineError, WorkerError};
use crate::render::{RenderEngine, RenderOptions};
use crate::splitter::{Block, BlockSplitter};

/// Worker lifecycle, as observed from the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// The engine + splitter pair a worker thread owns.
///
/// Constructed on the worker thread so the caller never shares the renderer
/// instance; one core per worker, never across workers.
pub struct WorkerCore {
    engine: RenderEngine,
    splitter: BlockSplitter,
}

impl WorkerCore {
    /// Build the default core.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the rendering stack cannot be
    /// constructed; the worker then reports initialization failure.
    pub fn new(options: RenderOptions) -> Result<Self, EngineError> {
        Ok(Self {
            engine: RenderEngine::new(options),
            splitter: BlockSplitter::new(),
        })
    }

    fn handle(&self, request: Request) -> Response {
        match request {
            Request::SplitText {
                request_id,
                markdown_text,
            } => {
                let blocks = if markdown_text.trim().is_empty() {
                    Vec::new()
                } else {
                    self.splitter.split(&self.engine, &markdown_text)
                };
                tracing::debug!(request_id, blocks = blocks.len(), "document split");
                Response::BlocksSplitted { request_id, blocks }
            }
            Request::ParseBlock {
                request_id,
                markdown_block,
                base_path,
            } => {
                let Block { id, markdown, .. } = markdown_block;
                if markdown.trim().is_empty() {
                    return Response::BlockParsed {
                        request_id,
                        html: String::new(),
                        original_id: id,
                    };
                }
                let html = self.engine.render_block(&id, &markdown, base_path.as_deref());
                Response::BlockParsed {
                    request_id,
                    html,
                    original_id: id,
                }
            }
        }
    }
}

enum Inbound {
    Request(Request),
    Json(String),
}

/// Spawns render workers.
pub struct RenderWorker;

impl RenderWorker {
    /// Spawn a worker with the default engine stack.
    pub fn spawn(options: RenderOptions) -> WorkerHandle {
        Self::spawn_with(move || WorkerCore::new(options))
    }

    /// Spawn a worker with an injected core constructor. Used by tests to
    /// exercise initialization failure and by alternative rendering stacks.
    pub fn spawn_with<F>(init: F) -> WorkerHandle
    where
        F: FnOnce() -> Result<WorkerCore, EngineError> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<Inbound>();
        let (response_tx, response_rx) = mpsc::channel::<Response>();
        let thread = thread::spawn(move || run(init, &request_rx, &response_tx));

        WorkerHandle {
            request_tx,
            response_rx,
            pending: RefCell::new(VecDeque::new()),
            failure: RefCell::new(None),
            next_request_id: AtomicU64::new(1),
            state: Cell::new(WorkerState::Initializing),
            _thread: thread,
        }
    }
}

/// Worker thread body: initialize once, then serve requests until the
/// handle drops.
fn run<F>(init: F, requests: &Receiver<Inbound>, responses: &Sender<Response>)
where
    F: FnOnce() -> Result<WorkerCore, EngineError>,
{
    tracing::debug!("render worker initializing");
    let core = match init() {
        Ok(core) => {
            tracing::debug!("render worker ready");
            let _ = responses.send(Response::WorkerReady);
            Some(core)
        }
        Err(err) => {
            tracing::error!(%err, "render worker failed to initialize");
            let _ = responses.send(Response::Error {
                request_id: None,
                message: format!("worker initialization failed: {err}"),
                original_id: None,
            });
            None
        }
    };

    while let Ok(inbound) = requests.recv() {
        let request = match inbound {
            Inbound::Request(request) => request,
            Inbound::Json(raw) => match serde_json::from_str::<Request>(&raw) {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!(%err, "discarding malformed request payload");
                    let _ = responses.send(Response::Error {
                        request_id: None,
                        message: format!("malformed request: {err}"),
                        original_id: None,
                    });
                    continue;
                }
            },
        };

        let response = match &core {
            Some(core) => core.handle(request),
            None => failed_response(&request),
        };
        if responses.send(response).is_err() {
            break;
        }
    }
    tracing::debug!("render worker shutting down");
}

/// Error answer for requests reaching a worker whose initialization failed.
fn failed_response(request: &Request) -> Response {
    let original_id = match request {
        Request::ParseBlock { markdown_block, .. } => Some(markdown_block.id.clone()),
        Request::SplitText { .. } => None,
    };
    Response::Error {
        request_id: Some(request.request_id()),
        message: "worker failed to initialize; request not processed".to_string(),
        original_id,
    }
}

/// Caller-side handle to a spawned worker.
///
/// Not `Sync`: a handle belongs to one caller, matching the one-queue-per-
/// worker model. Responses can arrive in any order relative to the caller's
/// bookkeeping; match them by correlation id.
pub struct WorkerHandle {
    request_tx: Sender<Inbound>,
    response_rx: Receiver<Response>,
    pending: RefCell<VecDeque<Response>>,
    failure: RefCell<Option<String>>,
    next_request_id: AtomicU64,
    state: Cell<WorkerState>,
    _thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Current lifecycle state as far as this handle has observed.
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Send a typed request. Queuing before readiness is fine.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Disconnected`] if the worker thread is gone.
    pub fn send(&self, request: Request) -> Result<(), WorkerError> {
        self.request_tx
            .send(Inbound::Request(request))
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Send a raw JSON payload. Malformed payloads are answered by the
    /// worker with a generic `error` response rather than an `Err` here.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Disconnected`] if the worker thread is gone.
    pub fn send_json(&self, payload: impl Into<String>) -> Result<(), WorkerError> {
        self.request_tx
            .send(Inbound::Json(payload.into()))
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Queue a `split_text` request, returning its correlation id.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Disconnected`] if the worker thread is gone.
    pub fn split_text(&self, markdown_text: impl Into<String>) -> Result<u64, WorkerError> {
        let request_id = self.allocate_request_id();
        self.send(Request::SplitText {
            request_id,
            markdown_text: markdown_text.into(),
        })?;
        Ok(request_id)
    }

    /// Queue a `parse_block` request, returning its correlation id.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Disconnected`] if the worker thread is gone.
    pub fn parse_block(
        &self,
        markdown_block: Block,
        base_path: Option<String>,
    ) -> Result<u64, WorkerError> {
        let request_id = self.allocate_request_id();
        self.send(Request::ParseBlock {
            request_id,
            markdown_block,
            base_path,
        })?;
        Ok(request_id)
    }

    /// Receive the next response, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Timeout`] when nothing arrives in time,
    /// [`WorkerError::Disconnected`] when the worker thread is gone and the
    /// queue is drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Response, WorkerError> {
        if let Some(response) = self.pending.borrow_mut().pop_front() {
            return Ok(response);
        }
        let response = self.response_rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => WorkerError::Timeout,
            RecvTimeoutError::Disconnected => WorkerError::Disconnected,
        })?;
        self.observe(&response);
        Ok(response)
    }

    /// Block until the worker settles into `Ready` or `Failed`.
    ///
    /// Responses other than the readiness signal that arrive while waiting
    /// are buffered for subsequent [`Self::recv_timeout`] calls.
    ///
    /// # Errors
    ///
    /// [`WorkerError::InitializationFailed`] when the worker reports a fatal
    /// initialization error; [`WorkerError::Timeout`] /
    /// [`WorkerError::Disconnected`] as for [`Self::recv_timeout`].
    pub fn wait_ready(&self, timeout: Duration) -> Result<(), WorkerError> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            match self.state.get() {
                WorkerState::Ready => return Ok(()),
                WorkerState::Failed => {
                    let message = self
                        .failure
                        .borrow()
                        .clone()
                        .unwrap_or_else(|| "worker reported initialization failure".to_string());
                    return Err(WorkerError::InitializationFailed { message });
                }
                WorkerState::Uninitialized | WorkerState::Initializing => {}
            }
            let remaining = deadline
                .checked_duration_since(std::time::Instant::now())
                .ok_or(WorkerError::Timeout)?;
            let response = self
                .response_rx
                .recv_timeout(remaining)
                .map_err(|err| match err {
                    RecvTimeoutError::Timeout => WorkerError::Timeout,
                    RecvTimeoutError::Disconnected => WorkerError::Disconnected,
                })?;
            if !self.observe(&response) {
                // Request responses arriving before the lifecycle settles are
                // buffered for later `recv_timeout` calls, never lost.
                self.pending.borrow_mut().push_back(response);
            }
        }
    }

    /// Track lifecycle transitions, returning true when `response` was a
    /// lifecycle signal rather than a request answer. The channel is FIFO and
    /// the worker emits its init outcome before anything else, so while the
    /// handle is `Initializing` an anonymous error can only be the
    /// initialization failure.
    fn observe(&self, response: &Response) -> bool {
        match response {
            Response::WorkerReady => {
                self.state.set(WorkerState::Ready);
                true
            }
            Response::Error {
                request_id: None,
                original_id: None,
                message,
            } if self.state.get() == WorkerState::Initializing => {
                self.state.set(WorkerState::Failed);
                *self.failure.borrow_mut() = Some(message.clone());
                true
            }
            _ => false,
        }
    }

    fn allocate_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }
}
