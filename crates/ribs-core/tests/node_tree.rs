//! Integration tests for the node tree: attach/detach cascades, state,
//! back navigation, views and diagnostics.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use ribs_core::bundle::Bundle;
use ribs_core::config::RecordingConfiguration;
use ribs_core::context::RibContext;
use ribs_core::events::{RibAction, RibActionState, RouterEventKind};
use ribs_core::interactor::{Interactor, InteractorContext, Presenter};
use ribs_core::lifecycle::{LifecycleSignal, PresenterEvent};
use ribs_core::node::{Node, NodeFactory, NodeHandle, NodeState};
use ribs_core::ref_watcher::{Breadcrumb, WeakLeakAuditor};
use ribs_core::router::{NodeConnector, Router, StaticRouter};
use ribs_core::routing_action::node_factory;
use ribs_core::view::{ContainerRef, RibView, ViewContainer, ViewRef};

type Log = Arc<Mutex<Vec<String>>>;

fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock())
}

fn recording_context() -> (RibContext, Arc<RecordingConfiguration>) {
    let recorder = Arc::new(RecordingConfiguration::new());
    let context = RibContext::builder().configuration(recorder.clone()).build();
    (context, recorder)
}

// =========================================================================
// Test components
// =========================================================================

struct Logic {
    name: &'static str,
    log: Log,
    consume_back: bool,
    value: Arc<AtomicI64>,
}

impl Logic {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            consume_back: false,
            value: Arc::new(AtomicI64::new(0)),
        }
    }

    fn consuming_back(mut self) -> Self {
        self.consume_back = true;
        self
    }

    fn with_value(mut self, value: Arc<AtomicI64>) -> Self {
        self.value = value;
        self
    }

    fn record(&self, what: &str) {
        self.log.lock().push(format!("{} {what}", self.name));
    }
}

impl Interactor for Logic {
    fn did_become_active(&self, _context: &InteractorContext, saved: Option<&Bundle>) {
        if let Some(value) = saved.and_then(|b| b.get_integer("value")) {
            self.value.store(value, Ordering::SeqCst);
        }
        self.record("active");
    }

    fn will_resign_active(&self) {
        self.record("resign");
    }

    fn handle_back_press(&self) -> bool {
        self.record("back");
        self.consume_back
    }

    fn on_save_instance_state(&self, out: &mut Bundle) {
        out.put("value", self.value.load(Ordering::SeqCst));
    }

    fn on_start(&self) {
        self.record("start");
    }

    fn on_stop(&self) {
        self.record("stop");
    }
}

struct LoggingRouter {
    log: Log,
    parts: Vec<NodeFactory>,
}

impl Router for LoggingRouter {
    fn did_load(&self, _node: &NodeHandle) {
        self.log.lock().push("router load".into());
    }

    fn on_attach(&self, _node: &NodeHandle, _saved_state: Option<&Bundle>) {
        self.log.lock().push("router attach".into());
    }

    fn on_detach(&self, _node: &NodeHandle) {
        self.log.lock().push("router detach".into());
    }

    fn permanent_parts(&self) -> Vec<NodeFactory> {
        self.parts.clone()
    }

    fn pop_back_stack(&self) -> bool {
        self.log.lock().push("router pop".into());
        false
    }
}

fn leaf(logic: Logic, context: &RibContext) -> Arc<Node> {
    let tag = logic.name;
    Node::builder(Arc::new(logic))
        .tag(tag)
        .context(context.clone())
        .build()
}

fn part(name: &'static str, log: &Log, context: &RibContext) -> NodeFactory {
    let (log, context) = (log.clone(), context.clone());
    node_factory(move || leaf(Logic::new(name, &log), &context))
}

fn tree(log: &Log, context: &RibContext) -> Arc<Node> {
    let router = LoggingRouter {
        log: log.clone(),
        parts: vec![part("first", log, context), part("second", log, context)],
    };
    Node::builder(Arc::new(Logic::new("root", log)))
        .tag("root")
        .router(Arc::new(router))
        .context(context.clone())
        .build()
}

// =========================================================================
// Structural cycle
// =========================================================================

#[test]
fn test_attach_order() {
    let (context, recorder) = recording_context();
    let log = Log::default();
    let root = tree(&log, &context);

    root.attach(None);

    assert_eq!(
        drain(&log),
        vec![
            "router load",
            "router attach",
            "first active",
            "second active",
            "root active"
        ]
    );
    assert_eq!(root.state(), NodeState::Attached);
    assert!(root.interactor_lifecycle().is_active());
    for child in root.children().iter() {
        assert!(child.is_attached());
        assert!(Arc::ptr_eq(&child.parent().unwrap(), &root));
    }
    assert!(recorder.reports().is_empty());
}

#[test]
fn test_detach_order() {
    let (context, _) = recording_context();
    let log = Log::default();
    let root = tree(&log, &context);
    root.attach(None);
    let children = root.children();
    drain(&log);

    root.detach();

    assert_eq!(
        drain(&log),
        vec!["root resign", "router detach", "second resign", "first resign"]
    );
    assert_eq!(root.state(), NodeState::Detached);
    assert!(root.children().is_empty());
    assert!(root.interactor_lifecycle().has_ended());
    for child in children.iter() {
        assert_eq!(child.state(), NodeState::Detached);
        assert!(child.parent().is_none());
    }
}

#[test]
fn test_duplicate_tag_warns_once() {
    let (context, recorder) = recording_context();
    let log = Log::default();
    let root = leaf(Logic::new("root", &log), &context);
    root.attach(None);

    root.attach_child(leaf(Logic::new("dup", &log), &context), None);
    root.attach_child(leaf(Logic::new("dup", &log), &context), None);

    assert_eq!(
        recorder.warnings(),
        vec!["Attaching a child node with a tag already in use: dup".to_string()]
    );
    assert_eq!(root.children().len(), 2);
}

#[test]
fn test_detach_of_unknown_child_warns() {
    let (context, recorder) = recording_context();
    let log = Log::default();
    let root = leaf(Logic::new("root", &log), &context);
    root.attach(None);
    let stranger = leaf(Logic::new("stranger", &log), &context);
    stranger.attach(None);
    let events = Arc::new(AtomicUsize::new(0));
    let counter = events.clone();
    context.events().router_events().connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    root.detach_child(&stranger);

    assert_eq!(
        recorder.warnings(),
        vec!["A node tried to detach a child that was never attached: stranger".to_string()]
    );
    assert_eq!(events.load(Ordering::SeqCst), 0);
    assert_eq!(stranger.state(), NodeState::Detached);
}

#[test]
fn test_interactor_attaches_children_through_its_node() {
    struct Spawner {
        context: RibContext,
        log: Log,
    }

    impl Interactor for Spawner {
        fn did_become_active(&self, context: &InteractorContext, _saved: Option<&Bundle>) {
            let child = leaf(Logic::new("spawned", &self.log), &self.context);
            context.node().attach_child(child, None);
        }
    }

    let (context, _) = recording_context();
    let log = Log::default();
    let root = Node::builder(Arc::new(Spawner {
        context: context.clone(),
        log: log.clone(),
    }))
    .context(context)
    .build();

    root.attach(None);

    assert_eq!(root.find_child("spawned").map(|c| c.is_attached()), Some(true));
    assert_eq!(drain(&log), vec!["spawned active"]);
}

// =========================================================================
// State
// =========================================================================

fn counter_tree(value: Arc<AtomicI64>, context: &RibContext, log: &Log) -> Arc<Node> {
    let (part_context, part_log) = (context.clone(), log.clone());
    let router = StaticRouter::new().with_part(move || {
        leaf(
            Logic::new("counter", &part_log).with_value(value.clone()),
            &part_context,
        )
    });
    Node::builder(Arc::new(Logic::new("root", log)))
        .tag("root")
        .router(Arc::new(router))
        .context(context.clone())
        .build()
}

#[test]
fn test_save_and_restore_state() {
    let (context, _) = recording_context();
    let log = Log::default();
    let first_value = Arc::new(AtomicI64::new(7));
    let first = counter_tree(first_value, &context, &log);
    first.attach(None);
    let original_tag = first.children()[0].interactor_tag();
    let saved = first.save_state();
    first.detach();

    let second_value = Arc::new(AtomicI64::new(0));
    let second = counter_tree(second_value.clone(), &context, &log);
    second.attach(Some(saved));

    assert_eq!(second_value.load(Ordering::SeqCst), 7);
    let restored = second.find_child("counter").unwrap();
    assert_eq!(restored.interactor_tag(), original_tag);
    assert_ne!(restored.id(), first.id());
}

#[test]
fn test_saved_child_state_is_keyed_by_tag() {
    let (context, _) = recording_context();
    let log = Log::default();
    let root = counter_tree(Arc::new(AtomicI64::new(3)), &context, &log);
    root.attach(None);

    let saved = root.save_state();

    let children = saved.get_bundle(ribs_core::bundle::keys::CHILDREN).unwrap();
    let counter = children.get_bundle("counter").unwrap();
    let interactor = counter
        .get_bundle(ribs_core::bundle::keys::INTERACTOR)
        .unwrap();
    assert_eq!(interactor.get_integer("value"), Some(3));
}

// =========================================================================
// Back navigation and host lifecycle
// =========================================================================

struct Window;
impl ViewContainer for Window {}

fn window() -> ContainerRef {
    Arc::new(Window)
}

#[test]
fn test_back_press_order() {
    let (context, _) = recording_context();
    let log = Log::default();
    let root = tree(&log, &context);
    root.attach(None);
    root.attach_to_view(&window());
    drain(&log);

    assert!(!root.handle_back_press());
    assert_eq!(
        drain(&log),
        vec!["second back", "first back", "root back", "router pop"]
    );
}

#[test]
fn test_back_press_stops_at_first_consumer() {
    let (context, _) = recording_context();
    let log = Log::default();
    let root = leaf(Logic::new("root", &log), &context);
    root.attach(None);
    root.attach_to_view(&window());
    root.attach_child(leaf(Logic::new("first", &log).consuming_back(), &context), None);
    root.attach_child(leaf(Logic::new("second", &log), &context), None);
    drain(&log);

    assert!(root.handle_back_press());
    assert_eq!(drain(&log), vec!["second back", "first back"]);
}

#[test]
fn test_back_press_skips_children_without_view() {
    let (context, _) = recording_context();
    let log = Log::default();
    let root = tree(&log, &context);
    root.attach(None);
    drain(&log);

    assert!(!root.handle_back_press());
    assert_eq!(drain(&log), vec!["root back", "router pop"]);
}

#[test]
fn test_host_lifecycle_cascades() {
    let (context, _) = recording_context();
    let log = Log::default();
    let root = tree(&log, &context);
    root.attach(None);
    drain(&log);

    root.on_start();
    root.on_stop();

    assert_eq!(
        drain(&log),
        vec![
            "root start",
            "first start",
            "second start",
            "root stop",
            "first stop",
            "second stop"
        ]
    );
}

// =========================================================================
// Presenter
// =========================================================================

#[derive(Default)]
struct RecordingPresenter {
    calls: Mutex<Vec<&'static str>>,
}

impl Presenter for RecordingPresenter {
    fn did_load(&self, lifecycle: &Arc<LifecycleSignal<PresenterEvent>>) {
        assert_eq!(lifecycle.current(), Some(PresenterEvent::Loaded));
        self.calls.lock().push("did_load");
    }

    fn will_unload(&self) {
        self.calls.lock().push("will_unload");
    }
}

#[test]
fn test_presenter_follows_interactor() {
    let (context, _) = recording_context();
    let log = Log::default();
    let presenter = Arc::new(RecordingPresenter::default());
    let node = Node::builder(Arc::new(Logic::new("screen", &log)))
        .presenter(presenter.clone())
        .context(context)
        .build();

    node.attach(None);
    assert!(node.presenter_lifecycle().is_active());

    node.detach();
    assert!(node.presenter_lifecycle().has_ended());
    assert_eq!(*presenter.calls.lock(), vec!["did_load", "will_unload"]);
}

/// Ends its own lifecycle early, which leaves the framework's unload out of order.
#[derive(Default)]
struct SelfUnloadingPresenter {
    lifecycle: Mutex<Option<Arc<LifecycleSignal<PresenterEvent>>>>,
}

impl Presenter for SelfUnloadingPresenter {
    fn did_load(&self, lifecycle: &Arc<LifecycleSignal<PresenterEvent>>) {
        *self.lifecycle.lock() = Some(lifecycle.clone());
    }

    fn will_unload(&self) {
        if let Some(lifecycle) = self.lifecycle.lock().take() {
            lifecycle.emit(PresenterEvent::Unloaded).unwrap();
        }
    }
}

#[test]
fn test_presenter_unload_out_of_order_is_reported() {
    let (context, recorder) = recording_context();
    let log = Log::default();
    let node = Node::builder(Arc::new(Logic::new("screen", &log)))
        .tag("screen")
        .presenter(Arc::new(SelfUnloadingPresenter::default()))
        .context(context)
        .build();
    node.attach(None);

    node.detach();

    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Presenter of `screen` cannot unload"));
    assert!(node.interactor_lifecycle().has_ended());
}

// =========================================================================
// Events and diagnostics
// =========================================================================

#[test]
fn test_router_events() {
    let (context, _) = recording_context();
    let log = Log::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    context.events().router_events().connect(move |event| {
        sink.lock()
            .push((event.kind, event.child.tag.clone(), event.parent.tag.clone()));
    });
    let root = leaf(Logic::new("root", &log), &context);
    root.attach(None);
    let child = leaf(Logic::new("child", &log), &context);

    root.attach_child(child.clone(), None);
    root.detach_child(&child);

    assert_eq!(
        *seen.lock(),
        vec![
            (RouterEventKind::Attached, "child".to_string(), "root".to_string()),
            (RouterEventKind::Detached, "child".to_string(), "root".to_string()),
        ]
    );
}

#[test]
fn test_action_events_only_when_enabled() {
    let (context, _) = recording_context();
    let log = Log::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    context.events().action_events().connect(move |event| {
        sink.lock().push((event.action, event.state));
    });

    let quiet = leaf(Logic::new("quiet", &log), &context);
    quiet.attach(None);
    assert!(seen.lock().is_empty());

    context.events().set_action_emission_enabled(true);
    let loud = leaf(Logic::new("loud", &log), &context);
    loud.attach(None);
    loud.detach();

    assert_eq!(
        *seen.lock(),
        vec![
            (RibAction::DidBecomeActive, RibActionState::Started),
            (RibAction::DidBecomeActive, RibActionState::Completed),
            (RibAction::WillResignActive, RibActionState::Started),
            (RibAction::WillResignActive, RibActionState::Completed),
        ]
    );
}

#[test]
fn test_leak_auditor_reports_retained_interactor() {
    let auditor = Arc::new(WeakLeakAuditor::new());
    let context = RibContext::builder()
        .configuration(Arc::new(RecordingConfiguration::new()))
        .reference_watcher(auditor.clone())
        .build();
    let log = Log::default();
    let root = leaf(Logic::new("root", &log), &context);
    root.attach(None);

    let retained = Arc::new(Logic::new("leaky", &log));
    let child = Node::builder(retained.clone())
        .tag("leaky")
        .context(context.clone())
        .build();
    root.attach_child(child.clone(), None);
    root.detach_child(&child);
    drop(child);

    let leaked = auditor.leaked();
    assert_eq!(leaked.len(), 1);
    assert!(leaked[0].contains("leaky"));

    drop(retained);
    assert!(auditor.leaked().is_empty());
}

#[test]
fn test_released_interactor_is_not_reported() {
    let auditor = Arc::new(WeakLeakAuditor::new());
    let context = RibContext::builder()
        .configuration(Arc::new(RecordingConfiguration::new()))
        .reference_watcher(auditor.clone())
        .build();
    let log = Log::default();
    let root = leaf(Logic::new("root", &log), &context);
    root.attach(None);
    let child = leaf(Logic::new("clean", &log), &context);

    root.attach_child(child.clone(), None);
    root.detach_child(&child);
    drop(child);

    assert!(auditor.leaked().is_empty());
}

#[test]
fn test_breadcrumbs() {
    let auditor = Arc::new(WeakLeakAuditor::new());
    let context = RibContext::builder()
        .configuration(Arc::new(RecordingConfiguration::new()))
        .reference_watcher(auditor.clone())
        .build();
    context.ref_watcher().set_breadcrumbs_enabled(true);
    let log = Log::default();
    let root = leaf(Logic::new("root", &log), &context);
    root.attach(None);
    let child = leaf(Logic::new("child", &log), &context);

    root.attach_child(child.clone(), None);
    root.handle_back_press();
    root.detach_child(&child);

    assert_eq!(
        auditor.breadcrumbs(),
        vec![
            (Breadcrumb::Attached, "child".to_string()),
            (Breadcrumb::BackPress, "root".to_string()),
            (Breadcrumb::Detached, "child".to_string()),
        ]
    );
}

// =========================================================================
// View cycle
// =========================================================================

#[derive(Default)]
struct Panel {
    added: AtomicUsize,
    removed: AtomicUsize,
    scroll: AtomicI64,
}

impl ViewContainer for Panel {
    fn add_view(&self, _view: &ViewRef) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    fn remove_view(&self, _view: &ViewRef) {
        self.removed.fetch_add(1, Ordering::SeqCst);
    }
}

impl RibView for Panel {
    fn save_hierarchy_state(&self, out: &mut Bundle) {
        out.put("scroll", self.scroll.load(Ordering::SeqCst));
    }

    fn restore_hierarchy_state(&self, state: &Bundle) {
        if let Some(scroll) = state.get_integer("scroll") {
            self.scroll.store(scroll, Ordering::SeqCst);
        }
    }
}

type Panels = Arc<Mutex<Vec<Arc<Panel>>>>;

fn panel_node(name: &'static str, panels: &Panels, log: &Log, context: &RibContext) -> Arc<Node> {
    let panels = panels.clone();
    Node::builder(Arc::new(Logic::new(name, log)))
        .tag(name)
        .view_factory(Arc::new(move |_parent: &ContainerRef| -> ViewRef {
            let panel = Arc::new(Panel::default());
            panels.lock().push(panel.clone());
            panel
        }))
        .context(context.clone())
        .build()
}

#[derive(Default)]
struct RecordingWindow {
    added: AtomicUsize,
    removed: AtomicUsize,
}

impl ViewContainer for RecordingWindow {
    fn add_view(&self, _view: &ViewRef) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    fn remove_view(&self, _view: &ViewRef) {
        self.removed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_view_cycle_nests_child_views() {
    let (context, _) = recording_context();
    let log = Log::default();
    let root_panels = Panels::default();
    let child_panels = Panels::default();
    let root = panel_node("root", &root_panels, &log, &context);
    root.attach(None);
    root.attach_child(panel_node("child", &child_panels, &log, &context), None);
    let child = root.find_child("child").unwrap();
    assert!(!child.is_view_attached());

    let recording = Arc::new(RecordingWindow::default());
    let window: ContainerRef = recording.clone();
    root.attach_to_view(&window);

    assert_eq!(recording.added.load(Ordering::SeqCst), 1);
    assert!(child.is_view_attached());
    let root_panel = root_panels.lock()[0].clone();
    assert_eq!(root_panel.added.load(Ordering::SeqCst), 1);

    root.detach_from_view();

    assert_eq!(recording.removed.load(Ordering::SeqCst), 1);
    assert_eq!(root_panel.removed.load(Ordering::SeqCst), 1);
    assert!(!child.is_view_attached());
    assert!(child.is_attached());
}

#[test]
fn test_view_state_survives_view_detach() {
    let (context, _) = recording_context();
    let log = Log::default();
    let panels = Panels::default();
    let node = panel_node("screen", &panels, &log, &context);
    node.attach(None);
    let window = window();

    node.attach_to_view(&window);
    panels.lock()[0].scroll.store(42, Ordering::SeqCst);
    node.detach_from_view();
    node.attach_to_view(&window);

    let panels = panels.lock();
    assert_eq!(panels.len(), 2);
    assert_eq!(panels[1].scroll.load(Ordering::SeqCst), 42);
}

#[test]
fn test_view_state_restored_from_saved_blob() {
    let (context, _) = recording_context();
    let log = Log::default();
    let first_panels = Panels::default();
    let first = panel_node("screen", &first_panels, &log, &context);
    first.attach(None);
    first.attach_to_view(&window());
    first_panels.lock()[0].scroll.store(9, Ordering::SeqCst);
    let saved = first.save_state();
    first.detach();

    let second_panels = Panels::default();
    let second = panel_node("screen", &second_panels, &log, &context);
    second.attach(Some(saved));
    second.attach_to_view(&window());

    assert_eq!(second_panels.lock()[0].scroll.load(Ordering::SeqCst), 9);
}

#[test]
fn test_child_attached_later_joins_view() {
    let (context, _) = recording_context();
    let log = Log::default();
    let panels = Panels::default();
    let root = panel_node("root", &panels, &log, &context);
    root.attach(None);
    root.attach_to_view(&window());

    let child = leaf(Logic::new("late", &log), &context);
    root.attach_child(child.clone(), None);

    assert!(child.is_view_attached());
    root.detach_child_view(&child);
    assert!(!child.is_view_attached());
    assert!(child.is_attached());
    root.attach_child_view(&child);
    assert!(child.is_view_attached());
}
