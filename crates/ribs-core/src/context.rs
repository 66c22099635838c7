//! The handle passed down the node tree.
//!
//! A [`RibContext`] bundles the collaborators every node needs: the
//! [`Configuration`] that receives non-fatal reports, the [`RibEvents`]
//! stream, the [`RefWatcher`], and the coordinator [`ThreadAffinity`].
//! It is cheap to clone; clones share state.
//!
//! Applications build one at startup on the coordinator thread and hand it to
//! every node they construct:
//!
//! ```
//! use std::sync::Arc;
//! use ribs_core::config::TracingConfiguration;
//! use ribs_core::context::RibContext;
//!
//! let context = RibContext::builder()
//!     .configuration(Arc::new(TracingConfiguration))
//!     .build();
//! assert!(context.coordinator().is_same_thread());
//! ```
//!
//! [`RibContext::global`] wires the process-wide configuration cell instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::config::{self, Configuration};
use crate::events::RibEvents;
use crate::ref_watcher::{RefWatcher, ReferenceWatcher};
use crate::thread_check::ThreadAffinity;

/// Global context instance.
static GLOBAL_CONTEXT: OnceLock<RibContext> = OnceLock::new();

struct ContextInner {
    configuration: Arc<dyn Configuration>,
    events: RibEvents,
    ref_watcher: RefWatcher,
    coordinator: ThreadAffinity,
    thread_checks: AtomicBool,
}

/// Shared collaborators of a node tree.
#[derive(Clone)]
pub struct RibContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for RibContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RibContext")
            .field("coordinator", &self.inner.coordinator)
            .field("thread_checks", &self.are_thread_checks_enabled())
            .finish_non_exhaustive()
    }
}

impl RibContext {
    /// The process-wide context.
    ///
    /// Created on first use with the configuration from
    /// [`config::configuration`]; the calling thread becomes the coordinator.
    pub fn global() -> RibContext {
        GLOBAL_CONTEXT
            .get_or_init(|| RibContext::builder().configuration(config::configuration()).build())
            .clone()
    }

    pub fn builder() -> RibContextBuilder {
        RibContextBuilder::default()
    }

    pub fn configuration(&self) -> &Arc<dyn Configuration> {
        &self.inner.configuration
    }

    pub fn events(&self) -> &RibEvents {
        &self.inner.events
    }

    pub fn ref_watcher(&self) -> &RefWatcher {
        &self.inner.ref_watcher
    }

    pub fn coordinator(&self) -> ThreadAffinity {
        self.inner.coordinator
    }

    pub fn set_thread_checks_enabled(&self, enabled: bool) {
        self.inner.thread_checks.store(enabled, Ordering::SeqCst);
    }

    pub fn are_thread_checks_enabled(&self) -> bool {
        self.inner.thread_checks.load(Ordering::Relaxed)
    }

    /// Report a violation if called off the coordinator thread.
    ///
    /// Returns `true` when the call is on the coordinator thread or checks
    /// are disabled. Callers continue either way.
    pub(crate) fn check_coordinator_thread(&self, operation: &str) -> bool {
        if !self.are_thread_checks_enabled() || self.inner.coordinator.is_same_thread() {
            return true;
        }
        let message = self.inner.coordinator.violation_message(operation);
        self.report_error(&message);
        false
    }

    pub(crate) fn report_error(&self, message: &str) {
        self.inner.configuration.handle_non_fatal_error(message, None);
    }

    pub(crate) fn report_warning(&self, message: &str) {
        self.inner.configuration.handle_non_fatal_warning(message, None);
    }

    pub(crate) fn report_debug(&self, message: &str) {
        self.inner.configuration.handle_debug_message(message);
    }
}

/// Builder for [`RibContext`].
pub struct RibContextBuilder {
    configuration: Option<Arc<dyn Configuration>>,
    reference_watcher: Option<Arc<dyn ReferenceWatcher>>,
    coordinator: Option<ThreadAffinity>,
    thread_checks: bool,
}

impl Default for RibContextBuilder {
    fn default() -> Self {
        Self {
            configuration: None,
            reference_watcher: None,
            coordinator: None,
            thread_checks: true,
        }
    }
}

impl RibContextBuilder {
    /// Use `configuration` instead of the process-wide one.
    pub fn configuration(mut self, configuration: Arc<dyn Configuration>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn reference_watcher(mut self, watcher: Arc<dyn ReferenceWatcher>) -> Self {
        self.reference_watcher = Some(watcher);
        self
    }

    /// Coordinator thread; defaults to the thread calling [`build`](Self::build).
    pub fn coordinator(mut self, coordinator: ThreadAffinity) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn thread_checks(mut self, enabled: bool) -> Self {
        self.thread_checks = enabled;
        self
    }

    pub fn build(self) -> RibContext {
        let ref_watcher = RefWatcher::new();
        if let Some(watcher) = self.reference_watcher {
            ref_watcher.set_reference_watcher(watcher);
        }
        RibContext {
            inner: Arc::new(ContextInner {
                configuration: self.configuration.unwrap_or_else(config::configuration),
                events: RibEvents::new(),
                ref_watcher,
                coordinator: self.coordinator.unwrap_or_default(),
                thread_checks: AtomicBool::new(self.thread_checks),
            }),
        }
    }
}
