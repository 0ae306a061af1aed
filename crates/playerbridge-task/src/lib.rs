//! Off-thread task scheduling for playerbridge.
//!
//! Store reads can block on disk or network. Callers on latency-sensitive
//! threads (platform event loops, async request handlers) hand that work
//! to an [`Executor`] and get a [`Task`] back instead of blocking.
//!
//! # Resolving a task
//!
//! A [`Task`] is both:
//! - a `Future`, for async callers: `task.await`
//! - a blocking handle, for plain threads: `task.wait()`
//!
//! # Cancellation
//!
//! Dropping a task (or calling [`Task::cancel`]) only detaches the caller.
//! Work already running keeps running to completion and its result is
//! discarded, so an interrupted caller never leaves a half-written store
//! operation behind. No timeout is imposed; callers wrap the future in
//! `tokio::time::timeout` if they want a deadline.
//!
//! ```ignore
//! let executor = TokioExecutor::current()?;
//! let task = executor.schedule(move || store.count_all());
//! let count = task.await??;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by the scheduling layer itself (never by the work).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The work never delivered a result: it panicked, or the runtime
    /// shut down before it ran.
    #[error("task aborted before producing a result")]
    Aborted,

    /// The task's result was already taken by an earlier poll.
    #[error("task polled after completion")]
    AlreadyResolved,

    /// No Tokio runtime is available to schedule on.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

enum TaskInner<T> {
    /// Result is already known (inline execution, constant values).
    Ready(Option<T>),
    /// Result arrives from the worker over a oneshot channel.
    Pending(oneshot::Receiver<T>),
}

/// Handle to work scheduled on an [`Executor`].
///
/// Resolves to `Ok(T)` with whatever the work returned, or to a
/// [`TaskError`] if the work never completed.
#[must_use = "a task does nothing observable unless awaited or waited on"]
pub struct Task<T> {
    inner: TaskInner<T>,
}

// `T` is only ever moved out of the `Option`, never pinned in place.
impl<T> Unpin for Task<T> {}

impl<T> Task<T> {
    /// A task that is already complete.
    pub fn ready(value: T) -> Self {
        Self {
            inner: TaskInner::Ready(Some(value)),
        }
    }

    fn pending(rx: oneshot::Receiver<T>) -> Self {
        Self {
            inner: TaskInner::Pending(rx),
        }
    }

    /// Blocks the current thread until the result is available.
    ///
    /// # Panics
    /// Panics if called from inside an async runtime context, where
    /// blocking would stall the runtime's worker thread. Async code
    /// should `.await` the task instead.
    pub fn wait(self) -> Result<T, TaskError> {
        match self.inner {
            TaskInner::Ready(value) => value.ok_or(TaskError::AlreadyResolved),
            TaskInner::Pending(rx) => {
                rx.blocking_recv().map_err(|_| TaskError::Aborted)
            }
        }
    }

    /// Gives up on the result. In-flight work is not interrupted.
    pub fn cancel(self) {
        if matches!(self.inner, TaskInner::Pending(_)) {
            trace!("pending task cancelled by caller");
        }
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T, TaskError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        match &mut self.inner {
            TaskInner::Ready(value) => {
                Poll::Ready(value.take().ok_or(TaskError::AlreadyResolved))
            }
            TaskInner::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|result| result.map_err(|_| TaskError::Aborted)),
        }
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.inner {
            TaskInner::Ready(Some(_)) => "ready",
            TaskInner::Ready(None) => "taken",
            TaskInner::Pending(_) => "pending",
        };
        f.debug_struct("Task").field("state", &state).finish()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs a unit of work somewhere other than (or instead of) the caller's
/// async context.
///
/// `schedule` is generic, so `Executor` is used as a type parameter rather
/// than a trait object.
pub trait Executor: Send + Sync + 'static {
    /// Schedules `work` and returns a handle to its result.
    fn schedule<T, F>(&self, work: F) -> Task<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static;
}

impl<E: Executor> Executor for Arc<E> {
    fn schedule<T, F>(&self, work: F) -> Task<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        (**self).schedule(work)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters kept by [`TokioExecutor`].
#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    completed: AtomicU64,
    discarded: AtomicU64,
}

/// Snapshot of [`TokioExecutor`] activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorMetrics {
    /// Tasks handed to the blocking pool.
    pub scheduled: u64,
    /// Tasks whose work returned (panicked work is not counted).
    pub completed: u64,
    /// Completed tasks whose caller had already cancelled.
    pub discarded: u64,
}

// ---------------------------------------------------------------------------
// TokioExecutor
// ---------------------------------------------------------------------------

/// Runs work on Tokio's blocking thread pool (`spawn_blocking`).
///
/// Cheap to clone; clones share the runtime handle and the counters.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
    counters: Arc<Counters>,
}

impl TokioExecutor {
    /// Creates an executor bound to a specific runtime.
    pub fn new(handle: Handle) -> Self {
        debug!("tokio executor created");
        Self {
            handle,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Creates an executor bound to the runtime the caller is running in.
    ///
    /// # Errors
    /// Returns [`TaskError::NoRuntime`] outside a Tokio runtime.
    pub fn current() -> Result<Self, TaskError> {
        let handle = Handle::try_current()
            .map_err(|e| TaskError::NoRuntime(e.to_string()))?;
        Ok(Self::new(handle))
    }

    /// Snapshot of the executor's counters.
    pub fn metrics(&self) -> ExecutorMetrics {
        ExecutorMetrics {
            scheduled: self.counters.scheduled.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Executor for TokioExecutor {
    fn schedule<T, F>(&self, work: F) -> Task<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let counters = Arc::clone(&self.counters);
        counters.scheduled.fetch_add(1, Ordering::Relaxed);

        // The JoinHandle is dropped on purpose: the oneshot carries the
        // result, and dropping a blocking JoinHandle never stops the work.
        self.handle.spawn_blocking(move || {
            let output = work();
            counters.completed.fetch_add(1, Ordering::Relaxed);
            if tx.send(output).is_err() {
                counters.discarded.fetch_add(1, Ordering::Relaxed);
                trace!("task finished after its caller cancelled");
            }
        });

        Task::pending(rx)
    }
}

// ---------------------------------------------------------------------------
// InlineExecutor
// ---------------------------------------------------------------------------

/// Runs work immediately on the calling thread.
///
/// For tools and tests that have no runtime and don't mind blocking.
/// Tasks it returns are always already resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn schedule<T, F>(&self, work: F) -> Task<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        Task::ready(work())
    }
}
