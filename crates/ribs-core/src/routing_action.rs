//! What a navigation configuration resolves to.
//!
//! A [`BackStackRouter`](crate::backstack::BackStackRouter) resolves each
//! configuration to a [`RoutingAction`] at most once per backstack entry. The
//! action's [`execute`](RoutingAction::execute) hook runs every time the
//! entry becomes current, its [`cleanup`](RoutingAction::cleanup) hook every
//! time it stops being current, and its
//! [`node_factories`](RoutingAction::node_factories) are asked for once, the
//! first time the entry needs live nodes.

use std::fmt;
use std::sync::Arc;

use crate::node::{Node, NodeFactory};

/// Resolution of a navigation configuration.
pub trait RoutingAction: Send + Sync + 'static {
    /// Preparation hook. Must be idempotent.
    fn execute(&self) {}

    fn cleanup(&self) {}

    /// Factories for the entry's child nodes, in attach order.
    fn node_factories(&self) -> Vec<NodeFactory> {
        Vec::new()
    }
}

/// Wrap a closure as a [`NodeFactory`].
pub fn node_factory<F>(factory: F) -> NodeFactory
where
    F: Fn() -> Arc<Node> + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// Does nothing and attaches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpRoutingAction;

impl RoutingAction for NoOpRoutingAction {}

/// Attaches the nodes built by its factories.
#[derive(Clone)]
pub struct AttachNodes {
    factories: Vec<NodeFactory>,
}

impl fmt::Debug for AttachNodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachNodes")
            .field("factories", &self.factories.len())
            .finish()
    }
}

impl AttachNodes {
    pub fn new(factories: Vec<NodeFactory>) -> Self {
        Self { factories }
    }

    pub fn single<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<Node> + Send + Sync + 'static,
    {
        Self::new(vec![node_factory(factory)])
    }
}

impl RoutingAction for AttachNodes {
    fn node_factories(&self) -> Vec<NodeFactory> {
        self.factories.clone()
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Runs closures instead of attaching nodes.
pub struct InvokeOnExecute {
    on_execute: Hook,
    on_cleanup: Option<Hook>,
}

impl InvokeOnExecute {
    pub fn new<F>(on_execute: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            on_execute: Box::new(on_execute),
            on_cleanup: None,
        }
    }

    pub fn on_cleanup<F>(mut self, on_cleanup: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_cleanup = Some(Box::new(on_cleanup));
        self
    }
}

impl RoutingAction for InvokeOnExecute {
    fn execute(&self) {
        (self.on_execute)();
    }

    fn cleanup(&self) {
        if let Some(on_cleanup) = &self.on_cleanup {
            on_cleanup();
        }
    }
}

/// Several actions acting as one.
///
/// Executes in order, cleans up in reverse order, concatenates factories.
#[derive(Default)]
pub struct CompositeRoutingAction {
    actions: Vec<Box<dyn RoutingAction>>,
}

impl CompositeRoutingAction {
    pub fn new(actions: Vec<Box<dyn RoutingAction>>) -> Self {
        Self { actions }
    }

    pub fn with(mut self, action: impl RoutingAction) -> Self {
        self.actions.push(Box::new(action));
        self
    }
}

impl RoutingAction for CompositeRoutingAction {
    fn execute(&self) {
        for action in &self.actions {
            action.execute();
        }
    }

    fn cleanup(&self) {
        for action in self.actions.iter().rev() {
            action.cleanup();
        }
    }

    fn node_factories(&self) -> Vec<NodeFactory> {
        self.actions
            .iter()
            .flat_map(|action| action.node_factories())
            .collect()
    }
}
