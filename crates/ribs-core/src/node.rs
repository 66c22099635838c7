//! The node tree.
//!
//! A [`Node`] owns exactly one business-logic component (an
//! [`Interactor`]), an optional [`Presenter`], an optional [`Router`] and an
//! optional [`ViewFactory`], plus an ordered list of child nodes. Lifecycle
//! calls enter at the root and propagate down:
//!
//! ```text
//! Created ──attach──▶ Attached ──detach──▶ Detached (terminal)
//!                        │  ▲
//!        attach_to_view  ▼  │  detach_from_view
//!                    ViewAttached
//! ```
//!
//! Structural attach and view attach are separate cycles. A node pushed
//! underneath in a backstack stays structurally attached while its view is
//! gone, and keeps its per-view hierarchy state in a separate blob.
//!
//! # Ordering
//!
//! - `attach`: router first, then the router's permanent children, then the
//!   interactor receives its saved state.
//! - `attach_child`: append, emit `Attached`, attach the child.
//! - `detach_child`: remove, emit `Detached` (only if removed), detach the
//!   child (interactor, router, then its own children in reverse order), hand
//!   the interactor to the leak auditor.
//! - back navigation: view-attached children in reverse order, then the
//!   interactor, then the router's back stack.
//!
//! The child list is copy-on-write. Traversals run over a snapshot and never
//! hold a lock while calling into user code, so callbacks may attach or
//! detach children re-entrantly.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ribs_core::context::RibContext;
//! use ribs_core::interactor::Interactor;
//! use ribs_core::node::Node;
//!
//! struct Root;
//! impl Interactor for Root {}
//! struct Child;
//! impl Interactor for Child {}
//!
//! let context = RibContext::builder().build();
//! let root = Node::builder(Arc::new(Root)).context(context.clone()).build();
//! root.attach(None);
//!
//! let child = Node::builder(Arc::new(Child)).context(context).build();
//! root.attach_child(child.clone(), None);
//! assert!(child.is_attached());
//! assert_eq!(root.children().len(), 1);
//!
//! root.detach_child(&child);
//! assert!(!child.is_attached());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::bundle::{keys, Bundle};
use crate::context::RibContext;
use crate::events::RouterEventKind;
use crate::interactor::{Interactor, InteractorHost, Presenter};
use crate::lifecycle::{InteractorEvent, LifecycleSignal, PresenterEvent};
use crate::logging::targets;
use crate::ref_watcher::Breadcrumb;
use crate::router::{NodeConnector, Router};
use crate::view::{ContainerRef, ViewFactory, ViewRef};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Created,
    Attached,
    /// Terminal. A detached node is never attached again.
    Detached,
}

/// Creates a fresh node. Used by routers and routing actions.
pub type NodeFactory = Arc<dyn Fn() -> Arc<Node> + Send + Sync>;

#[derive(Default)]
struct ViewSlot {
    attached: bool,
    view: Option<ViewRef>,
    container: Option<ContainerRef>,
    /// Hierarchy state to restore on the next view attach.
    saved_state: Option<Bundle>,
}

/// A unit of the tree.
///
/// Nodes are always handled through `Arc<Node>`; see [`Node::builder`].
pub struct Node {
    id: NodeId,
    tag: String,
    context: RibContext,
    self_ref: Weak<Node>,
    interactor: InteractorHost,
    router: Option<Arc<dyn Router>>,
    view_factory: Option<Arc<dyn ViewFactory>>,
    children: RwLock<Arc<Vec<Arc<Node>>>>,
    parent: Mutex<Weak<Node>>,
    state: Mutex<NodeState>,
    saved_state: Mutex<Option<Bundle>>,
    view: Mutex<ViewSlot>,
    /// Set while the parent's router keeps this node's view detached.
    view_parked: AtomicBool,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("state", &self.state())
            .field("view_attached", &self.is_view_attached())
            .field("children", &self.children().len())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Start building a node around `interactor`.
    ///
    /// The tag defaults to the interactor's type name.
    pub fn builder<I: Interactor>(interactor: Arc<I>) -> NodeBuilder {
        let type_name = std::any::type_name::<I>();
        let short = type_name.rsplit("::").next().unwrap_or(type_name);
        NodeBuilder {
            interactor,
            tag: short.to_string(),
            presenter: None,
            router: None,
            view_factory: None,
            context: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn context(&self) -> &RibContext {
        &self.context
    }

    pub fn state(&self) -> NodeState {
        *self.state.lock()
    }

    pub fn is_attached(&self) -> bool {
        self.state() == NodeState::Attached
    }

    pub fn is_view_attached(&self) -> bool {
        self.view.lock().attached
    }

    /// The node's view, while view-attached and built by a view factory.
    pub fn view(&self) -> Option<ViewRef> {
        self.view.lock().view.clone()
    }

    pub fn router(&self) -> Option<&Arc<dyn Router>> {
        self.router.as_ref()
    }

    /// The interactor's tag; restored from saved state on attach.
    pub fn interactor_tag(&self) -> String {
        self.interactor.tag()
    }

    pub fn interactor_lifecycle(&self) -> &Arc<LifecycleSignal<InteractorEvent>> {
        self.interactor.lifecycle()
    }

    pub fn presenter_lifecycle(&self) -> &Arc<LifecycleSignal<PresenterEvent>> {
        self.interactor.presenter_lifecycle()
    }

    /// Snapshot of the current children, in attach order.
    pub fn children(&self) -> Arc<Vec<Arc<Node>>> {
        self.children.read().clone()
    }

    pub fn find_child(&self, tag: &str) -> Option<Arc<Node>> {
        self.children().iter().find(|child| child.tag == tag).cloned()
    }

    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.lock().upgrade()
    }

    /// A weak handle for routers and interactors.
    pub fn handle(&self) -> NodeHandle {
        NodeHandle(self.self_ref.clone())
    }

    // =========================================================================
    // Structural cycle
    // =========================================================================

    /// Attach this node, delivering `saved_state` from a previous
    /// [`save_state`](Self::save_state).
    ///
    /// Attaching an attached node is a no-op. Attaching a detached node is
    /// reported as an error and ignored.
    #[tracing::instrument(skip_all, target = "ribs_core::node", level = "trace", fields(tag = %self.tag))]
    pub fn attach(&self, saved_state: Option<Bundle>) {
        self.context.check_coordinator_thread("Node::attach");
        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            if previous == NodeState::Created {
                *state = NodeState::Attached;
            }
            previous
        };
        match previous {
            NodeState::Created => {}
            NodeState::Attached => {
                self.context
                    .report_debug(&format!("Node `{}` is already attached", self.tag));
                return;
            }
            NodeState::Detached => {
                self.context.report_error(&format!(
                    "Node `{}` was detached and cannot be attached again",
                    self.tag
                ));
                return;
            }
        }

        self.view.lock().saved_state = saved_state
            .as_ref()
            .and_then(|saved| saved.get_bundle(keys::VIEW_STATE))
            .cloned();
        *self.saved_state.lock() = saved_state.clone();

        if let Some(router) = &self.router {
            let handle = self.handle();
            router.did_load(&handle);
            router.on_attach(&handle, saved_state.as_ref().and_then(|s| s.get_bundle(keys::ROUTER)));
            for factory in router.permanent_parts() {
                self.attach_child(factory(), None);
            }
        }

        self.interactor
            .dispatch_attach(self, saved_state.as_ref().and_then(|s| s.get_bundle(keys::INTERACTOR)));
        tracing::debug!(target: targets::NODE, id = %self.id, tag = %self.tag, "node attached");
    }

    /// Detach this node and its subtree.
    ///
    /// Only the root is detached directly; everything else goes through
    /// [`detach_child`](Self::detach_child) on its parent.
    #[tracing::instrument(skip_all, target = "ribs_core::node", level = "trace", fields(tag = %self.tag))]
    pub fn detach(&self) {
        self.context.check_coordinator_thread("Node::detach");
        {
            let mut state = self.state.lock();
            if *state != NodeState::Attached {
                drop(state);
                self.context
                    .report_debug(&format!("Node `{}` is not attached", self.tag));
                return;
            }
            *state = NodeState::Detached;
        }

        self.detach_from_view();
        self.interactor.dispatch_detach(self);
        if let Some(router) = &self.router {
            router.on_detach(&self.handle());
        }
        let children = self.children();
        for child in children.iter().rev() {
            self.detach_child(child);
        }
        tracing::debug!(target: targets::NODE, id = %self.id, tag = %self.tag, "node detached");
    }

    /// Append `child` and attach it.
    ///
    /// Without an explicit `saved_state` the child receives the blob this
    /// node saved for its tag, if any. A tag already used by a sibling is
    /// reported as a warning and the child is attached anyway.
    #[tracing::instrument(
        skip_all,
        target = "ribs_core::node",
        level = "trace",
        fields(parent = %self.tag, child = %child.tag)
    )]
    pub fn attach_child(&self, child: Arc<Node>, saved_state: Option<Bundle>) {
        self.context.check_coordinator_thread("Node::attach_child");
        if self.children().iter().any(|sibling| sibling.tag == child.tag) {
            self.context.report_warning(&format!(
                "Attaching a child node with a tag already in use: {}",
                child.tag
            ));
        }

        Arc::make_mut(&mut *self.children.write()).push(child.clone());
        *child.parent.lock() = self.self_ref.clone();
        self.context
            .ref_watcher()
            .log_breadcrumb(Breadcrumb::Attached, &child.tag, Some(&self.tag));
        self.context
            .events()
            .emit_router_event(RouterEventKind::Attached, &child, self);

        let saved_state = saved_state.or_else(|| self.saved_child_state(&child.tag));
        child.attach(saved_state);

        if self.is_view_attached() {
            self.attach_child_view(&child);
        }
    }

    /// Remove `child` and detach it.
    ///
    /// A child that is not in the list is reported as a warning and detached
    /// anyway.
    #[tracing::instrument(
        skip_all,
        target = "ribs_core::node",
        level = "trace",
        fields(parent = %self.tag, child = %child.tag)
    )]
    pub fn detach_child(&self, child: &Arc<Node>) {
        self.context.check_coordinator_thread("Node::detach_child");
        let removed = {
            let mut children = self.children.write();
            let position = children.iter().position(|c| Arc::ptr_eq(c, child));
            match position {
                Some(index) => {
                    Arc::make_mut(&mut *children).remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            *child.parent.lock() = Weak::new();
            self.context
                .events()
                .emit_router_event(RouterEventKind::Detached, child, self);
        } else {
            self.context.report_warning(&format!(
                "A node tried to detach a child that was never attached: {}",
                child.tag
            ));
        }

        child.detach();

        if let Some(saved) = self.saved_state.lock().as_mut() {
            if saved.get_bundle(keys::CHILDREN).is_some() {
                saved.bundle_mut(keys::CHILDREN).remove(&child.tag);
            }
        }

        let ref_watcher = self.context.ref_watcher();
        ref_watcher.watch_deleted_object(
            Arc::downgrade(child.interactor.logic()),
            &format!("Interactor of `{}` ({})", child.tag, child.id),
        );
        ref_watcher.log_breadcrumb(Breadcrumb::Detached, &child.tag, Some(&self.tag));
    }

    fn saved_child_state(&self, tag: &str) -> Option<Bundle> {
        self.saved_state
            .lock()
            .as_ref()
            .and_then(|saved| saved.get_bundle(keys::CHILDREN))
            .and_then(|children| children.get_bundle(tag))
            .cloned()
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Compose this node's state blob: router and interactor state, every
    /// child's blob keyed by tag, and the view hierarchy state.
    pub fn save_state(&self) -> Bundle {
        let mut out = Bundle::new();

        if let Some(router) = &self.router {
            let mut router_state = Bundle::new();
            router.on_save_instance_state(&mut router_state);
            if !router_state.is_empty() {
                out.put(keys::ROUTER, router_state);
            }
        }

        out.put(keys::INTERACTOR, self.interactor.save_instance_state());

        let children = self.children();
        if !children.is_empty() {
            let mut saved = Bundle::new();
            for child in children.iter() {
                saved.put(child.tag.clone(), child.save_state());
            }
            out.put(keys::CHILDREN, saved);
        }

        if let Some(view_state) = self.view_state() {
            out.put(keys::VIEW_STATE, view_state);
        }
        out
    }

    /// Save the live view's hierarchy state so the next view attach restores it.
    pub fn save_view_state(&self) {
        let view = self.view.lock().view.clone();
        if let Some(view) = view {
            let mut state = Bundle::new();
            view.save_hierarchy_state(&mut state);
            self.view.lock().saved_state = Some(state);
        }
    }

    fn view_state(&self) -> Option<Bundle> {
        let (view, saved) = {
            let slot = self.view.lock();
            (slot.view.clone(), slot.saved_state.clone())
        };
        match view {
            Some(view) => {
                let mut state = Bundle::new();
                view.save_hierarchy_state(&mut state);
                Some(state)
            }
            None => saved,
        }
    }

    // =========================================================================
    // Back navigation and host lifecycle
    // =========================================================================

    /// Offer a back navigation to the subtree. Returns `true` once consumed.
    pub fn handle_back_press(&self) -> bool {
        self.context
            .ref_watcher()
            .log_breadcrumb(Breadcrumb::BackPress, &self.tag, None);
        let children = self.children();
        for child in children.iter().rev() {
            if child.is_view_attached() && child.handle_back_press() {
                return true;
            }
        }
        if self.interactor.logic().handle_back_press() {
            return true;
        }
        self.router
            .as_ref()
            .is_some_and(|router| router.pop_back_stack())
    }

    pub fn on_start(&self) {
        self.interactor.logic().on_start();
        for child in self.children().iter() {
            child.on_start();
        }
    }

    pub fn on_stop(&self) {
        self.interactor.logic().on_stop();
        for child in self.children().iter() {
            child.on_stop();
        }
    }

    pub fn on_resume(&self) {
        self.interactor.logic().on_resume();
        for child in self.children().iter() {
            child.on_resume();
        }
    }

    pub fn on_pause(&self) {
        self.interactor.logic().on_pause();
        for child in self.children().iter() {
            child.on_pause();
        }
    }

    // =========================================================================
    // View cycle
    // =========================================================================

    /// Create this node's view inside `parent` and cascade to the children.
    ///
    /// Children whose view was detached by this node's router stay detached.
    pub fn attach_to_view(&self, parent: &ContainerRef) {
        self.context.check_coordinator_thread("Node::attach_to_view");
        {
            let mut slot = self.view.lock();
            if slot.attached {
                return;
            }
            slot.attached = true;
            slot.container = Some(parent.clone());
        }

        if let Some(factory) = &self.view_factory {
            let view = factory.create_view(parent);
            parent.add_view(&view);
            let restored = self.view.lock().saved_state.take();
            if let Some(state) = &restored {
                view.restore_hierarchy_state(state);
            }
            self.view.lock().view = Some(view.clone());
            self.interactor.logic().on_view_created(&view);
        }

        for child in self.children().iter() {
            if !child.view_parked.load(Ordering::SeqCst) {
                self.attach_view_of(child);
            }
        }
        tracing::trace!(target: targets::NODE, tag = %self.tag, "view attached");
    }

    /// Save the view's hierarchy state, then remove it and every descendant view.
    pub fn detach_from_view(&self) {
        self.context.check_coordinator_thread("Node::detach_from_view");
        let (view, container) = {
            let mut slot = self.view.lock();
            if !slot.attached {
                return;
            }
            slot.attached = false;
            (slot.view.take(), slot.container.take())
        };

        for child in self.children().iter() {
            child.detach_from_view();
        }

        if let Some(view) = view {
            let mut state = Bundle::new();
            view.save_hierarchy_state(&mut state);
            self.view.lock().saved_state = Some(state);
            self.interactor.logic().on_view_destroyed();
            if let Some(container) = container {
                container.remove_view(&view);
            }
        }
        tracing::trace!(target: targets::NODE, tag = %self.tag, "view detached");
    }

    /// Reattach the view of a structurally attached child.
    pub fn attach_child_view(&self, child: &Arc<Node>) {
        child.view_parked.store(false, Ordering::SeqCst);
        self.attach_view_of(child);
    }

    /// Detach a child's view while keeping it structurally attached.
    pub fn detach_child_view(&self, child: &Arc<Node>) {
        child.view_parked.store(true, Ordering::SeqCst);
        child.detach_from_view();
    }

    fn attach_view_of(&self, child: &Node) {
        if let Some(container) = self.container_for_child(child) {
            child.attach_to_view(&container);
        }
    }

    /// Where a child's view goes: the router's choice, else this node's view,
    /// else this node's own container.
    fn container_for_child(&self, child: &Node) -> Option<ContainerRef> {
        let slot = self.view.lock();
        if !slot.attached {
            return None;
        }
        let own = match &slot.view {
            Some(view) => {
                let container: ContainerRef = view.clone();
                Some(container)
            }
            None => slot.container.clone(),
        };
        drop(slot);

        self.router
            .as_ref()
            .and_then(|router| router.parent_container_for_child(child))
            .or(own)
    }

    // =========================================================================
    // Debug / Diagnostics
    // =========================================================================

    /// Indented dump of the subtree.
    pub fn dump_tree(&self) -> String {
        let mut output = String::new();
        self.dump_tree_recursive(0, &mut output);
        output
    }

    fn dump_tree_recursive(&self, depth: usize, output: &mut String) {
        let indent = "  ".repeat(depth);
        let view = if self.is_view_attached() { " [view]" } else { "" };
        output.push_str(&format!(
            "{indent}[{}] {} ({:?}){view}\n",
            self.id,
            self.tag,
            self.state()
        ));
        for child in self.children().iter() {
            child.dump_tree_recursive(depth + 1, output);
        }
    }
}

/// Builder for [`Node`].
pub struct NodeBuilder {
    interactor: Arc<dyn Interactor>,
    tag: String,
    presenter: Option<Arc<dyn Presenter>>,
    router: Option<Arc<dyn Router>>,
    view_factory: Option<Arc<dyn ViewFactory>>,
    context: Option<RibContext>,
}

impl NodeBuilder {
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn view_factory(mut self, factory: Arc<dyn ViewFactory>) -> Self {
        self.view_factory = Some(factory);
        self
    }

    /// Defaults to [`RibContext::global`].
    pub fn context(mut self, context: RibContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn build(self) -> Arc<Node> {
        let id = NodeId::next();
        let context = self.context.unwrap_or_else(RibContext::global);
        let interactor_tag = format!("{}.{}", self.tag, id.as_raw());
        Arc::new_cyclic(|self_ref| Node {
            id,
            tag: self.tag,
            context,
            self_ref: self_ref.clone(),
            interactor: InteractorHost::new(self.interactor, self.presenter, interactor_tag),
            router: self.router,
            view_factory: self.view_factory,
            children: RwLock::new(Arc::new(Vec::new())),
            parent: Mutex::new(Weak::new()),
            state: Mutex::new(NodeState::Created),
            saved_state: Mutex::new(None),
            view: Mutex::new(ViewSlot::default()),
            view_parked: AtomicBool::new(false),
        })
    }
}

/// Weak reference to a node, handed to routers and interactors.
///
/// Calls on a handle whose node was dropped are ignored.
#[derive(Clone)]
pub struct NodeHandle(Weak<Node>);

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.upgrade() {
            Some(node) => write!(f, "NodeHandle({} {})", node.id, node.tag),
            None => f.write_str("NodeHandle(<dropped>)"),
        }
    }
}

impl NodeHandle {
    pub fn node(&self) -> Option<Arc<Node>> {
        self.0.upgrade()
    }

    fn with_node(&self, operation: &str, f: impl FnOnce(&Node)) {
        match self.0.upgrade() {
            Some(node) => f(&node),
            None => tracing::warn!(target: targets::NODE, operation, "node handle outlived its node"),
        }
    }
}

impl NodeConnector for NodeHandle {
    fn attach_child(&self, child: Arc<Node>, saved_state: Option<Bundle>) {
        self.with_node("attach_child", |node| node.attach_child(child, saved_state));
    }

    fn detach_child(&self, child: &Arc<Node>) {
        self.with_node("detach_child", |node| node.detach_child(child));
    }

    fn attach_child_view(&self, child: &Arc<Node>) {
        self.with_node("attach_child_view", |node| node.attach_child_view(child));
    }

    fn detach_child_view(&self, child: &Arc<Node>) {
        self.with_node("detach_child_view", |node| node.detach_child_view(child));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordingConfiguration;
    use crate::interactor::InteractorContext;

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    impl Interactor for Recorder {
        fn did_become_active(&self, context: &InteractorContext, saved: Option<&Bundle>) {
            let restored = saved.and_then(|b| b.get_integer("count")).unwrap_or(0);
            self.log
                .lock()
                .push(format!("active {} {restored}", context.tag()));
        }

        fn will_resign_active(&self) {
            self.log.lock().push("resign".into());
        }

        fn on_save_instance_state(&self, out: &mut Bundle) {
            out.put("count", 7);
        }
    }

    fn context() -> (RibContext, Arc<RecordingConfiguration>) {
        let recorder = Arc::new(RecordingConfiguration::new());
        (RibContext::builder().configuration(recorder.clone()).build(), recorder)
    }

    #[test]
    fn test_default_tag_is_type_name() {
        let (context, _) = context();
        let node = Node::builder(Arc::new(Recorder::default())).context(context).build();
        assert_eq!(node.tag(), "Recorder");
        assert_eq!(node.state(), NodeState::Created);
    }

    #[test]
    fn test_attach_twice_is_noop() {
        let (context, recorder) = context();
        let logic = Arc::new(Recorder::default());
        let node = Node::builder(logic.clone()).tag("root").context(context).build();

        node.attach(None);
        node.attach(None);

        assert_eq!(logic.log.lock().len(), 1);
        assert!(recorder.errors().is_empty());
        assert!(node.interactor_lifecycle().is_active());
    }

    #[test]
    fn test_reattach_after_detach_is_reported() {
        let (context, recorder) = context();
        let node = Node::builder(Arc::new(Recorder::default())).context(context).build();
        node.attach(None);
        node.detach();
        node.attach(None);

        assert_eq!(node.state(), NodeState::Detached);
        assert_eq!(recorder.errors().len(), 1);
    }

    #[test]
    fn test_interactor_tag_survives_save_restore() {
        let (context, _) = context();
        let first = Node::builder(Arc::new(Recorder::default()))
            .context(context.clone())
            .build();
        first.attach(None);
        let saved = first.save_state();

        let logic = Arc::new(Recorder::default());
        let second = Node::builder(logic.clone()).context(context).build();
        second.attach(Some(saved));

        assert_eq!(second.interactor_tag(), first.interactor_tag());
        assert_eq!(
            logic.log.lock()[0],
            format!("active {} 7", first.interactor_tag())
        );
    }

    #[test]
    fn test_dump_tree() {
        let (context, _) = context();
        let root = Node::builder(Arc::new(Recorder::default()))
            .tag("root")
            .context(context.clone())
            .build();
        root.attach(None);
        root.attach_child(
            Node::builder(Arc::new(Recorder::default()))
                .tag("leaf")
                .context(context)
                .build(),
            None,
        );

        let dump = root.dump_tree();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("root (Attached)"));
        assert!(lines[1].starts_with("  ["));
        assert!(lines[1].contains("leaf"));
    }

    #[test]
    fn test_handle_outliving_node_is_ignored() {
        let (context, _) = context();
        let node = Node::builder(Arc::new(Recorder::default()))
            .context(context.clone())
            .build();
        let handle = node.handle();
        drop(node);

        let orphan = Node::builder(Arc::new(Recorder::default())).context(context).build();
        handle.attach_child(orphan.clone(), None);
        assert!(handle.node().is_none());
        assert_eq!(orphan.state(), NodeState::Created);
    }
}
