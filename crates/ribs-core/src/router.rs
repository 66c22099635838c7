//! Routers decide which children a node has.
//!
//! A [`Router`] is attached to its node before any child exists. It may
//! declare permanent children through [`Router::permanent_parts`], attach
//! and detach children dynamically through the [`NodeConnector`] it receives,
//! or delegate to a
//! [`BackStackRouter`](crate::backstack::BackStackRouter) for history-aware
//! navigation.

use std::sync::Arc;

use crate::bundle::Bundle;
use crate::node::{Node, NodeFactory, NodeHandle};
use crate::view::ContainerRef;

/// Per-node controller of the child list.
pub trait Router: Send + Sync + 'static {
    /// Called once, before the first [`on_attach`](Self::on_attach).
    fn did_load(&self, _node: &NodeHandle) {}

    /// The node is being attached. `saved_state` is what
    /// [`on_save_instance_state`](Self::on_save_instance_state) wrote last time.
    fn on_attach(&self, _node: &NodeHandle, _saved_state: Option<&Bundle>) {}

    /// The node's interactor has resigned; children are detached next.
    fn on_detach(&self, _node: &NodeHandle) {}

    fn on_save_instance_state(&self, _out: &mut Bundle) {}

    /// Children attached on every attach, in order.
    fn permanent_parts(&self) -> Vec<NodeFactory> {
        Vec::new()
    }

    /// Handle a back navigation the subtree did not consume.
    fn pop_back_stack(&self) -> bool {
        false
    }

    /// Container for a child's view. `None` uses the node's own view.
    fn parent_container_for_child(&self, _child: &Node) -> Option<ContainerRef> {
        None
    }
}

/// Structural operations a router performs on its node.
pub trait NodeConnector: Send + Sync + 'static {
    fn attach_child(&self, child: Arc<Node>, saved_state: Option<Bundle>);

    fn detach_child(&self, child: &Arc<Node>);

    /// Reattach the view of a child that is still structurally attached.
    fn attach_child_view(&self, child: &Arc<Node>);

    /// Detach a child's view, keeping the child attached.
    fn detach_child_view(&self, child: &Arc<Node>);
}

/// A router with a fixed set of children.
#[derive(Default)]
pub struct StaticRouter {
    parts: Vec<NodeFactory>,
}

impl StaticRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permanent child.
    pub fn with_part<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<Node> + Send + Sync + 'static,
    {
        self.parts.push(Arc::new(factory));
        self
    }
}

impl Router for StaticRouter {
    fn permanent_parts(&self) -> Vec<NodeFactory> {
        self.parts.clone()
    }
}
