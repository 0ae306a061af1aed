//! `Pending<T>`: the handle returned by every `_async` directory call.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use playerbridge_task::Task;

use crate::DirectoryError;

/// The eventual result of a directory query.
///
/// Await it from async code or call [`wait`](Self::wait) from a plain
/// thread. Either way it resolves to the query's own result, with
/// scheduling failures folded into [`DirectoryError::Task`].
///
/// Dropping or [`cancel`](Self::cancel)-ing a `Pending` does not abort
/// store I/O that is already running; its result is discarded.
#[must_use = "a pending query does nothing observable unless awaited or waited on"]
#[derive(Debug)]
pub struct Pending<T> {
    task: Task<Result<T, DirectoryError>>,
}

impl<T> Pending<T> {
    pub(crate) fn new(task: Task<Result<T, DirectoryError>>) -> Self {
        Self { task }
    }

    /// Already resolved to `value`.
    pub fn ready(value: T) -> Self {
        Self::new(Task::ready(Ok(value)))
    }

    /// Already resolved to `err`.
    pub fn failed(err: DirectoryError) -> Self {
        Self::new(Task::ready(Err(err)))
    }

    /// Blocks the current thread until the result is available.
    ///
    /// # Panics
    /// Panics if called from inside an async runtime context while the
    /// query is still running. Async code should `.await` instead.
    pub fn wait(self) -> Result<T, DirectoryError> {
        self.task.wait()?
    }

    /// Gives up on the result. Running work is not interrupted.
    pub fn cancel(self) {
        self.task.cancel();
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, DirectoryError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|result| match result {
            Ok(inner) => inner,
            Err(e) => Err(e.into()),
        })
    }
}
