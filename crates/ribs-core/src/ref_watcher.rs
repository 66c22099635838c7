//! Leak auditing for detached business logic.
//!
//! When a node is detached its business-logic component is handed to the
//! [`RefWatcher`] as a weak reference. A [`ReferenceWatcher`] implementation
//! decides what to do with it. [`WeakLeakAuditor`] keeps the weak references
//! and reports the ones that are still alive.
//!
//! The watcher also receives breadcrumbs for attach, detach and back-press
//! events when breadcrumb logging is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::interactor::Interactor;
use crate::logging::targets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Breadcrumb {
    Attached,
    Detached,
    BackPress,
}

/// Receives detached components and breadcrumbs.
pub trait ReferenceWatcher: Send + Sync + 'static {
    /// `object` is expected to be released soon.
    fn watch(&self, object: Weak<dyn Interactor>, description: &str);

    fn breadcrumb(&self, _event: Breadcrumb, _child: &str, _parent: Option<&str>) {}
}

/// Front-end used by the node tree.
pub struct RefWatcher {
    watcher: RwLock<Option<Arc<dyn ReferenceWatcher>>>,
    leak_detection: AtomicBool,
    breadcrumbs: AtomicBool,
}

impl Default for RefWatcher {
    fn default() -> Self {
        Self {
            watcher: RwLock::new(None),
            leak_detection: AtomicBool::new(true),
            breadcrumbs: AtomicBool::new(false),
        }
    }
}

impl RefWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reference_watcher(&self, watcher: Arc<dyn ReferenceWatcher>) {
        *self.watcher.write() = Some(watcher);
    }

    pub fn set_leak_detection_enabled(&self, enabled: bool) {
        self.leak_detection.store(enabled, Ordering::SeqCst);
    }

    pub fn set_breadcrumbs_enabled(&self, enabled: bool) {
        self.breadcrumbs.store(enabled, Ordering::SeqCst);
    }

    /// Hand a detached component to the installed watcher.
    pub fn watch_deleted_object(&self, object: Weak<dyn Interactor>, description: &str) {
        if !self.leak_detection.load(Ordering::SeqCst) {
            return;
        }
        let watcher = self.watcher.read().clone();
        if let Some(watcher) = watcher {
            watcher.watch(object, description);
        }
    }

    pub fn log_breadcrumb(&self, event: Breadcrumb, child: &str, parent: Option<&str>) {
        if !self.breadcrumbs.load(Ordering::SeqCst) {
            return;
        }
        tracing::trace!(target: targets::REF_WATCHER, ?event, child, parent, "breadcrumb");
        let watcher = self.watcher.read().clone();
        if let Some(watcher) = watcher {
            watcher.breadcrumb(event, child, parent);
        }
    }
}

/// Keeps weak references to detached components and reports survivors.
#[derive(Default)]
pub struct WeakLeakAuditor {
    watched: Mutex<Vec<(String, Weak<dyn Interactor>)>>,
    breadcrumbs: Mutex<Vec<(Breadcrumb, String)>>,
}

impl WeakLeakAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptions of watched components that are still strongly referenced.
    ///
    /// Released entries are pruned.
    pub fn leaked(&self) -> Vec<String> {
        let mut watched = self.watched.lock();
        watched.retain(|(_, object)| object.strong_count() > 0);
        watched.iter().map(|(description, _)| description.clone()).collect()
    }

    /// Number of components handed over so far that are still tracked.
    pub fn watched_count(&self) -> usize {
        self.watched.lock().len()
    }

    pub fn breadcrumbs(&self) -> Vec<(Breadcrumb, String)> {
        self.breadcrumbs.lock().clone()
    }
}

impl ReferenceWatcher for WeakLeakAuditor {
    fn watch(&self, object: Weak<dyn Interactor>, description: &str) {
        let mut watched = self.watched.lock();
        watched.retain(|(_, object)| object.strong_count() > 0);
        watched.push((description.to_string(), object));
    }

    fn breadcrumb(&self, event: Breadcrumb, child: &str, _parent: Option<&str>) {
        self.breadcrumbs.lock().push((event, child.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Logic;
    impl Interactor for Logic {}

    #[test]
    fn test_auditor_reports_live_objects() {
        let auditor = Arc::new(WeakLeakAuditor::new());
        let watcher = RefWatcher::new();
        watcher.set_reference_watcher(auditor.clone());

        let kept: Arc<dyn Interactor> = Arc::new(Logic);
        let released: Arc<dyn Interactor> = Arc::new(Logic);
        watcher.watch_deleted_object(Arc::downgrade(&kept), "kept");
        watcher.watch_deleted_object(Arc::downgrade(&released), "released");
        drop(released);

        assert_eq!(auditor.leaked(), vec!["kept".to_string()]);
        drop(kept);
        assert!(auditor.leaked().is_empty());
        assert_eq!(auditor.watched_count(), 0);
    }

    #[test]
    fn test_released_objects_are_pruned_on_watch() {
        let auditor = WeakLeakAuditor::new();
        for round in 0..100 {
            let object: Arc<dyn Interactor> = Arc::new(Logic);
            auditor.watch(Arc::downgrade(&object), &format!("screen {round}"));
        }
        assert_eq!(auditor.watched_count(), 1);

        let kept: Arc<dyn Interactor> = Arc::new(Logic);
        auditor.watch(Arc::downgrade(&kept), "kept");
        assert_eq!(auditor.watched_count(), 1);
        assert_eq!(auditor.leaked(), vec!["kept".to_string()]);
    }

    #[test]
    fn test_leak_detection_can_be_disabled() {
        let auditor = Arc::new(WeakLeakAuditor::new());
        let watcher = RefWatcher::new();
        watcher.set_reference_watcher(auditor.clone());
        watcher.set_leak_detection_enabled(false);

        let object: Arc<dyn Interactor> = Arc::new(Logic);
        watcher.watch_deleted_object(Arc::downgrade(&object), "object");
        assert_eq!(auditor.watched_count(), 0);
    }

    #[test]
    fn test_breadcrumbs_are_opt_in() {
        let auditor = Arc::new(WeakLeakAuditor::new());
        let watcher = RefWatcher::new();
        watcher.set_reference_watcher(auditor.clone());

        watcher.log_breadcrumb(Breadcrumb::Attached, "child", Some("root"));
        assert!(auditor.breadcrumbs().is_empty());

        watcher.set_breadcrumbs_enabled(true);
        watcher.log_breadcrumb(Breadcrumb::BackPress, "child", None);
        assert_eq!(auditor.breadcrumbs(), vec![(Breadcrumb::BackPress, "child".to_string())]);
    }
}
