//! Lifecycle-bound background work.
//!
//! A [`Worker`] is a start/stop pair. [`WorkBinder::bind`] runs the start
//! routine in a child [`TaskScope`] of the caller's scope and stops the
//! worker when the first of these happens:
//!
//! - the lifecycle reaches its closing event ([`StopCause::LifecycleEnded`]),
//! - [`BindWorkerHandle::unbind`] is called ([`StopCause::Unbound`]),
//! - the caller's scope is cancelled ([`StopCause::ScopeCancelled`]),
//! - the start routine fails or panics ([`StopCause::StartFailed`]).
//!
//! The stop routine runs exactly once per binding. Start counts as complete
//! when the start routine returns; work it spawned into its scope keeps
//! running until the scope is cancelled.
//!
//! ```
//! use std::sync::Arc;
//! use ribs_core::lifecycle::{InteractorEvent, LifecycleSignal};
//! use ribs_core::scope::TaskScope;
//! use ribs_core::worker::{from_fn, WorkBinder};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let lifecycle = Arc::new(LifecycleSignal::new());
//! lifecycle.emit(InteractorEvent::Active).unwrap();
//!
//! let worker = Arc::new(from_fn(|scope: TaskScope| async move {
//!     scope.spawn(async { /* poll something until cancelled */ });
//!     Ok(())
//! }));
//! let handle = WorkBinder::bind(&TaskScope::current(), worker, &lifecycle).unwrap();
//! handle.join().await.unwrap();
//!
//! lifecycle.emit(InteractorEvent::Inactive).unwrap();
//! assert!(!handle.is_bound());
//! # }
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{LifecycleError, WorkerError};
use crate::lifecycle::{LifecycleEvent, LifecycleSignal};
use crate::logging::targets;
use crate::scope::TaskScope;

/// Background work bound to a lifecycle window.
pub trait Worker: Send + Sync + 'static {
    /// Start the worker. Long-running work goes into `scope`.
    fn on_start(&self, scope: TaskScope) -> impl Future<Output = Result<(), WorkerError>> + Send;

    /// Stop the worker. Should be fast and non-blocking.
    fn on_stop(&self, _cause: &StopCause) -> Result<(), WorkerError> {
        Ok(())
    }
}

/// Why a worker was stopped.
#[derive(Debug, Clone)]
pub enum StopCause {
    Unbound,
    LifecycleEnded,
    ScopeCancelled,
    StartFailed(WorkerError),
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::Unbound => f.write_str("Worker was manually unbound."),
            StopCause::LifecycleEnded => f.write_str("Lifecycle reached its closing event."),
            StopCause::ScopeCancelled => f.write_str("Binding scope was cancelled."),
            StopCause::StartFailed(error) => write!(f, "Worker start failed: {error}"),
        }
    }
}

/// A worker made of a start closure.
pub struct FnWorker<F> {
    start: F,
}

/// Wrap a start closure as a [`Worker`].
pub fn from_fn<F, Fut>(start: F) -> FnWorker<F>
where
    F: Fn(TaskScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    FnWorker { start }
}

impl<F, Fut> Worker for FnWorker<F>
where
    F: Fn(TaskScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    fn on_start(&self, scope: TaskScope) -> impl Future<Output = Result<(), WorkerError>> + Send {
        (self.start)(scope)
    }
}

#[derive(Debug, Clone)]
enum BindStatus {
    Starting,
    Started,
    Failed(WorkerError),
    Cancelled,
}

type StopFn = Box<dyn Fn(&StopCause) -> Result<(), WorkerError> + Send + Sync>;
type Unsubscribe = Box<dyn FnOnce() + Send>;

struct Binding {
    worker: &'static str,
    scope: TaskScope,
    stopped: AtomicBool,
    on_stop: StopFn,
    unsubscribe: Mutex<Option<Unsubscribe>>,
    status: watch::Sender<BindStatus>,
}

impl Binding {
    /// Stop the binding. `None` if it was already stopped.
    fn stop(&self, cause: StopCause) -> Option<Result<(), WorkerError>> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.scope.cancel();
        if let Some(unsubscribe) = self.unsubscribe.lock().take() {
            unsubscribe();
        }
        tracing::debug!(target: targets::WORKER, worker = self.worker, %cause, "stopping worker");
        Some((self.on_stop)(&cause))
    }

    /// Stop outside of a start failure; stop errors go to the scope's sink.
    fn stop_reporting(&self, cause: StopCause) {
        if let Some(Err(error)) = self.stop(cause) {
            self.scope.report(&WorkerError::StopFailed {
                source: Box::new(error),
            });
        }
    }

    fn fail(&self, primary: WorkerError) {
        let suppressed = match self.stop(StopCause::StartFailed(primary.clone())) {
            Some(Err(error)) => Some(Box::new(error)),
            _ => None,
        };
        let failure = WorkerError::StartFailed {
            source: Box::new(primary),
            suppressed,
        };
        tracing::warn!(target: targets::WORKER, worker = self.worker, error = %failure, "worker start failed");
        self.status.send_replace(BindStatus::Failed(failure.clone()));
        self.scope.report(&failure);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Binds workers to lifecycle windows.
pub struct WorkBinder;

impl WorkBinder {
    /// Start `worker` in a child of `scope` and stop it when `lifecycle`
    /// reaches its closing event.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotStarted`] or [`LifecycleError::AlreadyEnded`]
    /// outside the lifecycle's active window.
    pub fn bind<W, E>(
        scope: &TaskScope,
        worker: Arc<W>,
        lifecycle: &Arc<LifecycleSignal<E>>,
    ) -> Result<BindWorkerHandle, LifecycleError>
    where
        W: Worker,
        E: LifecycleEvent,
    {
        lifecycle.ensure_alive()?;

        let worker_scope = scope.child();
        let stopper = worker.clone();
        let (status, _) = watch::channel(BindStatus::Starting);
        let binding = Arc::new(Binding {
            worker: std::any::type_name::<W>(),
            scope: worker_scope.clone(),
            stopped: AtomicBool::new(false),
            on_stop: Box::new(move |cause| stopper.on_stop(cause)),
            unsubscribe: Mutex::new(None),
            status,
        });

        let observed = Arc::downgrade(&binding);
        let connection = lifecycle.subscribe(move |event: &E| {
            if *event < E::CLOSING {
                return;
            }
            if let Some(binding) = observed.upgrade() {
                binding.stop_reporting(StopCause::LifecycleEnded);
            }
        });
        let signal = Arc::downgrade(lifecycle);
        let unsubscribe: Unsubscribe = Box::new(move || {
            if let Some(signal) = signal.upgrade() {
                signal.unsubscribe(connection);
            }
        });
        if binding.stopped.load(Ordering::SeqCst) {
            unsubscribe();
        } else {
            *binding.unsubscribe.lock() = Some(unsubscribe);
        }

        let running = binding.clone();
        worker_scope.handle().spawn(async move {
            let token = running.scope.token().clone();
            let start_scope = running.scope.clone();
            let start = AssertUnwindSafe(async move { worker.on_start(start_scope).await }).catch_unwind();
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = start => Some(result),
            };

            match outcome {
                None => {
                    running.status.send_replace(BindStatus::Cancelled);
                    running.stop_reporting(StopCause::ScopeCancelled);
                }
                Some(Ok(Ok(()))) => {
                    tracing::trace!(target: targets::WORKER, worker = running.worker, "worker started");
                    running.status.send_replace(BindStatus::Started);
                    token.cancelled().await;
                    running.stop_reporting(StopCause::ScopeCancelled);
                }
                Some(Ok(Err(error))) => running.fail(error),
                Some(Err(payload)) => running.fail(WorkerError::Panicked(panic_message(payload))),
            }
        });

        Ok(BindWorkerHandle { binding })
    }

    /// Bind each worker to `lifecycle`.
    ///
    /// # Errors
    ///
    /// Fails before binding anything if `lifecycle` is outside its active window.
    pub fn bind_all<W, E>(
        scope: &TaskScope,
        workers: impl IntoIterator<Item = Arc<W>>,
        lifecycle: &Arc<LifecycleSignal<E>>,
    ) -> Result<Vec<BindWorkerHandle>, LifecycleError>
    where
        W: Worker,
        E: LifecycleEvent,
    {
        lifecycle.ensure_alive()?;
        workers
            .into_iter()
            .map(|worker| Self::bind(scope, worker, lifecycle))
            .collect()
    }
}

/// One start/stop cycle of a bound worker.
pub struct BindWorkerHandle {
    binding: Arc<Binding>,
}

impl fmt::Debug for BindWorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindWorkerHandle")
            .field("worker", &self.binding.worker)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl BindWorkerHandle {
    /// Wait until the start routine returned.
    ///
    /// # Errors
    ///
    /// The start failure ([`WorkerError::StartFailed`]), or
    /// [`WorkerError::Cancelled`] if the binding stopped first.
    pub async fn join(&self) -> Result<(), WorkerError> {
        let mut status = self.binding.status.subscribe();
        let settled = match status
            .wait_for(|status| !matches!(status, BindStatus::Starting))
            .await
        {
            Ok(status) => status.clone(),
            Err(_) => BindStatus::Cancelled,
        };
        match settled {
            BindStatus::Started => Ok(()),
            BindStatus::Failed(error) => Err(error),
            BindStatus::Starting | BindStatus::Cancelled => Err(WorkerError::Cancelled),
        }
    }

    /// Stop the worker now.
    ///
    /// # Errors
    ///
    /// [`WorkerError::StopFailed`] if the stop routine failed. Unbinding an
    /// already stopped worker succeeds without calling it again.
    pub fn unbind(&self) -> Result<(), WorkerError> {
        match self.binding.stop(StopCause::Unbound) {
            Some(Err(error)) => Err(WorkerError::StopFailed {
                source: Box::new(error),
            }),
            _ => Ok(()),
        }
    }

    pub fn is_bound(&self) -> bool {
        !self.binding.stopped.load(Ordering::SeqCst)
    }

    /// Scope the worker runs in.
    pub fn scope(&self) -> &TaskScope {
        &self.binding.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::InteractorEvent;

    struct Counting {
        stops: Mutex<Vec<String>>,
    }

    impl Worker for Counting {
        async fn on_start(&self, _scope: TaskScope) -> Result<(), WorkerError> {
            Ok(())
        }

        fn on_stop(&self, cause: &StopCause) -> Result<(), WorkerError> {
            self.stops.lock().push(cause.to_string());
            Ok(())
        }
    }

    fn active() -> Arc<LifecycleSignal<InteractorEvent>> {
        let lifecycle = Arc::new(LifecycleSignal::new());
        lifecycle.emit(InteractorEvent::Active).unwrap();
        lifecycle
    }

    #[tokio::test]
    async fn test_unbind_stops_once() {
        let worker = Arc::new(Counting { stops: Mutex::new(Vec::new()) });
        let lifecycle = active();
        let handle = WorkBinder::bind(&TaskScope::current(), worker.clone(), &lifecycle).unwrap();
        handle.join().await.unwrap();

        handle.unbind().unwrap();
        handle.unbind().unwrap();
        lifecycle.emit(InteractorEvent::Inactive).unwrap();

        assert!(!handle.is_bound());
        assert_eq!(*worker.stops.lock(), vec!["Worker was manually unbound.".to_string()]);
    }

    #[tokio::test]
    async fn test_lifecycle_end_stops_synchronously() {
        let worker = Arc::new(Counting { stops: Mutex::new(Vec::new()) });
        let lifecycle = active();
        let handle = WorkBinder::bind(&TaskScope::current(), worker.clone(), &lifecycle).unwrap();
        handle.join().await.unwrap();

        lifecycle.emit(InteractorEvent::Inactive).unwrap();
        assert_eq!(
            *worker.stops.lock(),
            vec!["Lifecycle reached its closing event.".to_string()]
        );
        assert!(handle.scope().is_cancelled());
    }

    #[test]
    fn test_bind_to_ended_lifecycle_fails() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let lifecycle = active();
        lifecycle.emit(InteractorEvent::Inactive).unwrap();
        let worker = Arc::new(Counting { stops: Mutex::new(Vec::new()) });

        let result = WorkBinder::bind(&TaskScope::new(runtime.handle().clone()), worker.clone(), &lifecycle);
        assert_eq!(result.unwrap_err(), LifecycleError::AlreadyEnded);
        assert!(worker.stops.lock().is_empty());
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(5_u8)), "unknown panic");
    }
}
