//! Error types for Ribs.
//!
//! Errors fall into the groups the framework treats differently:
//!
//! - [`LifecycleError`] is always returned to the caller. Binding or awaiting
//!   on a signal outside its window is a resource-lifetime bug in the caller.
//! - [`ConfigError`] is returned when the process-wide configuration cell is
//!   initialized more than once or after first use.
//! - [`BundleError`] covers typed access into state blobs.
//! - [`WorkerError`] is what worker start/stop routines produce, including the
//!   composite start failure carrying a suppressed stop failure.
//!
//! Logic violations and recoverable inconsistencies inside the node tree are
//! not errors in this sense; they are routed to the
//! [`Configuration`](crate::config::Configuration) collaborator.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised by a [`LifecycleSignal`](crate::lifecycle::LifecycleSignal).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// No event at or past the opening boundary has been emitted yet.
    #[error("lifecycle has not started yet")]
    NotStarted,
    /// The signal is at or past its closing boundary.
    #[error("lifecycle has already ended")]
    AlreadyEnded,
    /// An event was emitted that does not move the signal forward.
    #[error("lifecycle event {attempted} emitted after {current}")]
    OutOfOrder {
        /// The event the signal currently holds.
        current: String,
        /// The rejected event.
        attempted: String,
    },
    /// The signal was dropped before it reached its closing event.
    #[error("lifecycle signal dropped before reaching its closing event")]
    Closed,
}

/// Errors raised by the process-wide configuration cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A configuration was already installed.
    #[error("a rib configuration has already been installed")]
    AlreadyConfigured,
    /// The default configuration was already handed out to rib code.
    #[error("attempting to set a configuration after using rib code")]
    ConfiguredAfterUse,
}

/// Errors raised when reading typed values out of a [`Bundle`](crate::bundle::Bundle).
#[derive(Debug, Error)]
pub enum BundleError {
    /// A value could not be converted to or from its serialized form.
    #[error("bundle serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The key exists but holds a different kind of value.
    #[error("bundle key `{key}` does not hold a {expected}")]
    TypeMismatch {
        /// The offending key.
        key: String,
        /// The value kind the caller asked for.
        expected: &'static str,
    },
}

/// Errors produced by workers and the work binder.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// A worker routine failed with a message.
    #[error("{0}")]
    Failed(String),
    /// A worker routine failed with an arbitrary error.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
    /// A worker start routine panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),
    /// The start routine failed. A failure of the stop routine that ran
    /// afterwards is kept as `suppressed`.
    #[error("worker start failed: {source}")]
    StartFailed {
        /// The primary failure raised by the start routine.
        source: Box<WorkerError>,
        /// The stop routine failure, if any.
        suppressed: Option<Box<WorkerError>>,
    },
    /// The stop routine failed while no start failure was propagating.
    #[error("worker stop failed: {source}")]
    StopFailed {
        /// The failure raised by the stop routine.
        source: Box<WorkerError>,
    },
    /// The binding was stopped before the start routine returned.
    #[error("worker binding cancelled before start completed")]
    Cancelled,
    /// Binding was refused by the lifecycle signal.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl WorkerError {
    /// Create a [`WorkerError::Failed`] from a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wrap an arbitrary error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(error))
    }

    /// The suppressed secondary failure, for [`WorkerError::StartFailed`].
    pub fn suppressed(&self) -> Option<&WorkerError> {
        match self {
            Self::StartFailed { suppressed, .. } => suppressed.as_deref(),
            _ => None,
        }
    }

    /// The primary failure, unwrapping start/stop envelopes.
    pub fn primary(&self) -> &WorkerError {
        match self {
            Self::StartFailed { source, .. } | Self::StopFailed { source } => source.primary(),
            other => other,
        }
    }
}

/// Umbrella error for fallible Ribs operations.
#[derive(Debug, Error)]
pub enum RibError {
    /// Lifecycle window violation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// Configuration cell misuse.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// State blob access failure.
    #[error(transparent)]
    Bundle(#[from] BundleError),
    /// Worker failure.
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// A specialized Result type for Ribs operations.
pub type Result<T> = std::result::Result<T, RibError>;
