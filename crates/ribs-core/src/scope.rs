//! Explicit task scopes.
//!
//! A [`TaskScope`] is a runtime handle, a cancellation token and an error
//! sink, passed down explicitly. [`child`](TaskScope::child) scopes are
//! cancelled with their parent; cancelling a child leaves the parent alone.
//!
//! ```
//! use ribs_core::scope::TaskScope;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let scope = TaskScope::current();
//! let child = scope.child();
//! let task = child.spawn(async { std::future::pending::<()>().await });
//!
//! scope.cancel();
//! assert!(child.is_cancelled());
//! assert_eq!(task.await.unwrap(), None);
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::{LifecycleError, WorkerError};
use crate::lifecycle::{LifecycleEvent, LifecycleSignal};
use crate::logging::targets;

/// Receives failures of work running in a scope.
pub type ErrorSink = Arc<dyn Fn(&WorkerError) + Send + Sync>;

/// Runtime handle + cancellation token + error sink.
#[derive(Clone)]
pub struct TaskScope {
    handle: Handle,
    token: CancellationToken,
    errors: ErrorSink,
}

impl fmt::Debug for TaskScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScope")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn log_error(error: &WorkerError) {
    tracing::error!(target: targets::WORKER, error = %error, "unhandled worker failure");
}

impl TaskScope {
    /// A root scope spawning onto `handle`. Failures are logged.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            token: CancellationToken::new(),
            errors: Arc::new(log_error),
        }
    }

    /// A root scope on the runtime of the calling task.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Route failures to `sink` instead of the log.
    pub fn with_error_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&WorkerError) + Send + Sync + 'static,
    {
        self.errors = Arc::new(sink);
        self
    }

    pub fn child(&self) -> TaskScope {
        TaskScope {
            handle: self.handle.clone(),
            token: self.token.child_token(),
            errors: self.errors.clone(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn report(&self, error: &WorkerError) {
        (self.errors)(error);
    }

    /// Spawn `future` in this scope. It is dropped on cancellation and the
    /// task then yields `None`.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.token.clone();
        self.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = future => Some(output),
            }
        })
    }

    /// A child scope cancelled when `lifecycle` reaches its closing event.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotStarted`] or [`LifecycleError::AlreadyEnded`]
    /// outside the lifecycle's active window.
    pub fn bound_to<E: LifecycleEvent>(
        &self,
        lifecycle: &LifecycleSignal<E>,
    ) -> Result<TaskScope, LifecycleError> {
        let closing = lifecycle.await_closing_event()?;
        let scope = self.child();
        let token = scope.token.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = closing => token.cancel(),
                _ = token.cancelled() => {}
            }
        });
        Ok(scope)
    }
}
