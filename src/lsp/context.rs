//! Per-request context, cancellation bookkeeping and the outbound queue

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{WorkDoneProgress, WorkDoneProgressBegin, WorkDoneProgressEnd};
use tracing::warn;

use crate::lsp::error::HandlerError;
use crate::rpc::message::{Notification, ProgressToken, RequestId};

/// How many cancelled-but-unseen and recently finished ids are remembered
const ID_HISTORY: usize = 64;

/// Notifications queued by handlers, written by the server loop
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    queue: Arc<Mutex<Vec<Notification>>>,
}

impl Outbox {
    pub fn push(&self, notification: Notification) {
        self.lock().push(notification);
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What handlers know about the request they serve
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: RequestId,
    cancel: CancellationToken,
    outbox: Outbox,
}

impl RequestContext {
    pub fn new(id: RequestId, cancel: CancellationToken, outbox: Outbox) -> Self {
        Self { id, cancel, outbox }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancellation checkpoint for handlers.
    pub fn check_cancelled(&self) -> Result<(), HandlerError> {
        if self.cancel.is_cancelled() {
            Err(HandlerError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn notify(&self, notification: Notification) {
        self.outbox.push(notification);
    }

    /// Queues a work-done `begin`. The matching `end` is queued when the
    /// returned guard drops, including when the handler is cut short.
    pub fn begin_progress(
        &self,
        token: ProgressToken,
        begin: WorkDoneProgressBegin,
    ) -> Result<WorkDoneGuard, HandlerError> {
        self.notify(Notification::progress(
            token.clone(),
            Some(WorkDoneProgress::Begin(begin)),
        )?);
        Ok(WorkDoneGuard {
            token,
            outbox: self.outbox.clone(),
        })
    }
}

/// Ends a work-done progress on drop
#[derive(Debug)]
pub struct WorkDoneGuard {
    token: ProgressToken,
    outbox: Outbox,
}

impl Drop for WorkDoneGuard {
    fn drop(&mut self) {
        let end = WorkDoneProgress::End(WorkDoneProgressEnd::default());
        match Notification::progress(self.token.clone(), Some(end)) {
            Ok(notification) => self.outbox.push(notification),
            Err(e) => warn!(token = %self.token, "Failed to build progress end: {}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The request is running and its token is now cancelled
    Signalled,
    /// The request has not started; it will be cancelled on arrival
    Deferred,
    /// The request already completed
    AlreadyFinished,
}

#[derive(Debug, Default)]
struct Registry {
    active: HashMap<RequestId, CancellationToken>,
    early: VecDeque<RequestId>,
    finished: VecDeque<RequestId>,
}

/// Tracks cancellation tokens by request id
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    inner: Mutex<Registry>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request and returns its token, already cancelled if a
    /// `$/cancelRequest` for this id arrived first.
    pub fn begin(&self, id: &RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        let mut registry = self.lock();
        if let Some(index) = registry.early.iter().position(|early| early == id) {
            registry.early.remove(index);
            token.cancel();
        }
        registry.active.insert(id.clone(), token.clone());
        token
    }

    pub fn finish(&self, id: &RequestId) {
        let mut registry = self.lock();
        registry.active.remove(id);
        remember(&mut registry.finished, id.clone());
    }

    pub fn cancel(&self, id: &RequestId) -> CancelOutcome {
        let mut registry = self.lock();
        if let Some(token) = registry.active.get(id) {
            token.cancel();
            return CancelOutcome::Signalled;
        }
        if registry.finished.contains(id) {
            return CancelOutcome::AlreadyFinished;
        }
        remember(&mut registry.early, id.clone());
        CancelOutcome::Deferred
    }

    /// Requests currently running
    pub fn in_flight(&self) -> usize {
        self.lock().active.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn remember(history: &mut VecDeque<RequestId>, id: RequestId) {
    if history.len() == ID_HISTORY {
        history.pop_front();
    }
    history.push_back(id);
}
