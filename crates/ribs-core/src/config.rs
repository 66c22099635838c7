//! The error-reporting collaborator.
//!
//! Every non-fatal error, warning and debug message the framework raises goes
//! through a [`Configuration`]. Two implementations ship with the crate:
//!
//! - [`DefaultConfiguration`] panics on errors and logs warnings and debug
//!   messages. This is the documented behavior when nothing was installed.
//! - [`TracingConfiguration`] logs everything, errors included, and lets
//!   execution continue. Hosts use it to degrade gracefully in production.
//!
//! A process-wide cell holds the configuration used by
//! [`RibContext::global`](crate::context::RibContext::global). It can be
//! installed exactly once, and only before any rib code has asked for it:
//!
//! ```no_run
//! use std::sync::Arc;
//! use ribs_core::config::{self, TracingConfiguration};
//! use ribs_core::error::ConfigError;
//!
//! config::set_configuration(Arc::new(TracingConfiguration)).unwrap();
//! assert_eq!(
//!     config::set_configuration(Arc::new(TracingConfiguration)),
//!     Err(ConfigError::AlreadyConfigured)
//! );
//! ```
//!
//! Contexts built with [`RibContextBuilder`](crate::context::RibContextBuilder)
//! may carry their own configuration instead.

use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ConfigError;
use crate::logging::targets;

/// Receives the framework's non-fatal reports.
pub trait Configuration: Send + Sync + 'static {
    /// A logic violation: double attach, off-thread mutation and the like.
    fn handle_non_fatal_error(&self, message: &str, error: Option<&(dyn Error + 'static)>);

    /// A recoverable inconsistency. The operation proceeds.
    fn handle_non_fatal_warning(&self, message: &str, error: Option<&(dyn Error + 'static)>);

    /// A debug message.
    fn handle_debug_message(&self, message: &str);
}

/// Panics on errors, logs warnings and debug messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConfiguration;

impl Configuration for DefaultConfiguration {
    fn handle_non_fatal_error(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        match error {
            Some(error) => panic!("{message}: {error}"),
            None => panic!("{message}"),
        }
    }

    fn handle_non_fatal_warning(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        tracing::warn!(target: targets::CONFIG, error = error.map(tracing::field::display), "{message}");
    }

    fn handle_debug_message(&self, message: &str) {
        tracing::debug!(target: targets::CONFIG, "{message}");
    }
}

/// Logs errors instead of panicking.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConfiguration;

impl Configuration for TracingConfiguration {
    fn handle_non_fatal_error(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        tracing::error!(target: targets::CONFIG, error = error.map(tracing::field::display), "{message}");
    }

    fn handle_non_fatal_warning(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        tracing::warn!(target: targets::CONFIG, error = error.map(tracing::field::display), "{message}");
    }

    fn handle_debug_message(&self, message: &str) {
        tracing::debug!(target: targets::CONFIG, "{message}");
    }
}

enum Installed {
    /// Handed out before anything was installed.
    Default(Arc<dyn Configuration>),
    /// Installed through [`set_configuration`].
    Custom(Arc<dyn Configuration>),
}

/// Global configuration cell.
static CONFIGURATION: Mutex<Option<Installed>> = Mutex::new(None);

/// Install the process-wide configuration.
///
/// # Errors
///
/// - [`ConfigError::AlreadyConfigured`] if a configuration was installed before.
/// - [`ConfigError::ConfiguredAfterUse`] if rib code already obtained the
///   default configuration.
pub fn set_configuration(configuration: Arc<dyn Configuration>) -> Result<(), ConfigError> {
    let mut slot = CONFIGURATION.lock();
    match *slot {
        Some(Installed::Custom(_)) => Err(ConfigError::AlreadyConfigured),
        Some(Installed::Default(_)) => Err(ConfigError::ConfiguredAfterUse),
        None => {
            *slot = Some(Installed::Custom(configuration));
            tracing::debug!(target: targets::CONFIG, "rib configuration installed");
            Ok(())
        }
    }
}

/// The process-wide configuration.
///
/// Hands out [`DefaultConfiguration`] if nothing was installed, after which
/// [`set_configuration`] is refused.
pub fn configuration() -> Arc<dyn Configuration> {
    let mut slot = CONFIGURATION.lock();
    match &*slot {
        Some(Installed::Custom(configuration)) | Some(Installed::Default(configuration)) => {
            configuration.clone()
        }
        None => {
            let configuration: Arc<dyn Configuration> = Arc::new(DefaultConfiguration);
            *slot = Some(Installed::Default(configuration.clone()));
            configuration
        }
    }
}

/// Records every report. Useful in tests to assert on warnings.
#[derive(Debug, Default)]
pub struct RecordingConfiguration {
    reports: Mutex<Vec<Report>>,
}

/// A report captured by [`RecordingConfiguration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Error(String),
    Warning(String),
    Debug(String),
}

impl RecordingConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports in arrival order.
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Warning(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Error(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl Configuration for RecordingConfiguration {
    fn handle_non_fatal_error(&self, message: &str, _error: Option<&(dyn Error + 'static)>) {
        self.reports.lock().push(Report::Error(message.to_string()));
    }

    fn handle_non_fatal_warning(&self, message: &str, _error: Option<&(dyn Error + 'static)>) {
        self.reports.lock().push(Report::Warning(message.to_string()));
    }

    fn handle_debug_message(&self, message: &str) {
        self.reports.lock().push(Report::Debug(message.to_string()));
    }
}
