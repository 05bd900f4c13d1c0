//! Shared worker pool for spill I/O.
//!
//! Spill tasks do blocking file I/O, so they run on tokio's blocking pool.
//! One [`TaskRunner`] is shared (cloned) by every spiller of a factory.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::{Result, SpillError};

#[derive(Clone)]
pub struct TaskRunner {
    handle: Handle,
    // Keeps an owned runtime alive for as long as any clone exists.
    _runtime: Option<Arc<Runtime>>,
}

impl TaskRunner {
    /// Build a dedicated multi-threaded runtime with `worker_threads` threads.
    pub fn new(worker_threads: usize) -> io::Result<Self> {
        let threads = worker_threads.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .max_blocking_threads(threads)
            .thread_name("pagespill-worker")
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(runtime)),
        })
    }

    /// Run tasks on an existing runtime owned by the caller.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// Run `task` off the calling thread. Never blocks.
    pub fn submit<T, F>(&self, task: F) -> OperationHandle<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        OperationHandle {
            inner: self.handle.spawn_blocking(task),
        }
    }
}

/// Completion handle for a submitted task.
///
/// Poll with [`is_done`](Self::is_done), block with [`wait`](Self::wait), or
/// `.await` it from async code. Dropping the handle does not cancel the task.
#[must_use = "dropping the handle loses the task's result"]
pub struct OperationHandle<T> {
    inner: JoinHandle<Result<T>>,
}

impl<T> OperationHandle<T> {
    pub fn is_done(&self) -> bool {
        self.inner.is_finished()
    }

    /// Block the current thread until the task resolves.
    ///
    /// Must not be called from inside an async task.
    pub fn wait(self) -> Result<T> {
        futures::executor::block_on(self)
    }
}

impl<T> Future for OperationHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(SpillError::TaskFailed(e.to_string())),
        })
    }
}
