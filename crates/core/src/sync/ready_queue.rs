//! Ready-queue: buffer operations until the backend finishes bootstrapping.
//!
//! ```text
//! Uninitialized --begin--> Initializing --finish--> Draining --empty--> Ready
//!                               |                       ^
//!                               +--fail--> Failed --begin (retry)
//! ```
//!
//! While the queue is not `Ready`, submissions are appended. Draining pops
//! one item at a time and only flips to `Ready` when it finds the queue
//! empty under the lock, so items submitted during the drain (re-entrant
//! submissions) are appended behind the remaining ones and drained in the
//! same pass. Order is strictly FIFO.

use std::collections::VecDeque;

use focusmode_domain::{FocusError, Result};
use parking_lot::Mutex;

/// Readiness of the backend as seen by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyState {
    Uninitialized,
    Initializing,
    /// Bootstrap finished; queued items are being handed out.
    Draining,
    Ready,
    /// Bootstrap failed. Queued items are kept for a later retry.
    Failed(String),
}

impl ReadyState {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// What happened to a submitted item.
#[derive(Debug, PartialEq, Eq)]
pub enum Submission<T> {
    /// The backend is ready: run it now.
    Run(T),
    /// Buffered at this (zero-based) position.
    Queued(usize),
}

#[derive(Debug)]
struct Inner<T> {
    state: ReadyState,
    pending: VecDeque<T>,
}

/// FIFO buffer of deferred operations with explicit readiness states
#[derive(Debug)]
pub struct ReadyQueue<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Default for ReadyQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReadyQueue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { state: ReadyState::Uninitialized, pending: VecDeque::new() }) }
    }

    pub fn state(&self) -> ReadyState {
        self.inner.lock().state.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Run `item` now if ready, otherwise buffer it.
    pub fn submit(&self, item: T) -> Submission<T> {
        let mut inner = self.inner.lock();
        if inner.state.is_ready() {
            return Submission::Run(item);
        }
        inner.pending.push_back(item);
        Submission::Queued(inner.pending.len() - 1)
    }

    /// Enter `Initializing`. Allowed from `Uninitialized` and, as a retry,
    /// from `Failed`.
    pub fn begin(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !matches!(inner.state, ReadyState::Uninitialized | ReadyState::Failed(_)) {
            return Err(FocusError::Internal(format!(
                "backend bootstrap already started (state: {:?})",
                inner.state
            )));
        }
        inner.state = ReadyState::Initializing;
        Ok(())
    }

    /// Bootstrap succeeded: start handing out queued items via
    /// [`ReadyQueue::next_pending`].
    pub fn finish(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != ReadyState::Initializing {
            return Err(FocusError::Internal(format!(
                "cannot finish bootstrap from state {:?}",
                inner.state
            )));
        }
        inner.state = ReadyState::Draining;
        Ok(())
    }

    /// Bootstrap failed. Queued items stay pending.
    pub fn fail(&self, reason: impl Into<String>) {
        self.inner.lock().state = ReadyState::Failed(reason.into());
    }

    /// Pop the next queued item while draining.
    ///
    /// Returns `None` and switches to `Ready` once the queue is empty. Returns
    /// `None` without side effects in any state other than `Draining`.
    pub fn next_pending(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        if inner.state != ReadyState::Draining {
            return None;
        }
        let next = inner.pending.pop_front();
        if next.is_none() {
            inner.state = ReadyState::Ready;
        }
        next
    }

    /// Drain to fixpoint, running `run` on every item in FIFO order.
    ///
    /// `run` may submit further items; they are drained before this returns.
    pub fn drain_with(&self, mut run: impl FnMut(T)) -> usize {
        let mut count = 0;
        while let Some(item) = self.next_pending() {
            run(item);
            count += 1;
        }
        count
    }
}
