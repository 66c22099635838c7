//! Tree-structure event stream.
//!
//! Every [`Node::attach_child`](crate::node::Node::attach_child) emits a
//! [`RouterEventKind::Attached`] event, and every
//! [`Node::detach_child`](crate::node::Node::detach_child) that actually
//! removed a child emits [`RouterEventKind::Detached`]. Observers connect to
//! [`RibEvents::router_events`].
//!
//! Action events ([`RibActionEvent`]) bracket calls into business logic and
//! are only emitted once enabled with
//! [`RibEvents::set_action_emission_enabled`].

use std::sync::atomic::{AtomicBool, Ordering};

use crate::node::{Node, NodeId};
use crate::signal::Signal;

/// Identity of a node at the time an event was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeInfo {
    pub id: NodeId,
    pub tag: String,
}

impl NodeInfo {
    pub(crate) fn of(node: &Node) -> Self {
        Self {
            id: node.id(),
            tag: node.tag().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterEventKind {
    Attached,
    Detached,
}

/// A child was attached to or detached from a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterEvent {
    pub kind: RouterEventKind,
    pub child: NodeInfo,
    pub parent: NodeInfo,
}

/// The business-logic callback an action event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RibAction {
    DidBecomeActive,
    WillResignActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RibActionState {
    Started,
    Completed,
}

/// Brackets a business-logic callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RibActionEvent {
    pub node: NodeInfo,
    pub action: RibAction,
    pub state: RibActionState,
}

/// Event streams shared by every node of a [`RibContext`](crate::context::RibContext).
#[derive(Default)]
pub struct RibEvents {
    router_events: Signal<RouterEvent>,
    action_events: Signal<RibActionEvent>,
    action_emission_enabled: AtomicBool,
}

impl RibEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach/detach events.
    pub fn router_events(&self) -> &Signal<RouterEvent> {
        &self.router_events
    }

    /// Business-logic action events.
    pub fn action_events(&self) -> &Signal<RibActionEvent> {
        &self.action_events
    }

    pub fn set_action_emission_enabled(&self, enabled: bool) {
        self.action_emission_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_action_emission_enabled(&self) -> bool {
        self.action_emission_enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn emit_router_event(&self, kind: RouterEventKind, child: &Node, parent: &Node) {
        self.router_events.emit(RouterEvent {
            kind,
            child: NodeInfo::of(child),
            parent: NodeInfo::of(parent),
        });
    }

    pub(crate) fn emit_action(&self, node: &Node, action: RibAction, state: RibActionState) {
        if !self.is_action_emission_enabled() {
            return;
        }
        self.action_events.emit(RibActionEvent {
            node: NodeInfo::of(node),
            action,
            state,
        });
    }
}
