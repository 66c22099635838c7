use std::sync::Arc;

use crate::bundle::Bundle;
use crate::logging::targets;
use crate::node::{Node, NodeFactory};
use crate::router::NodeConnector;
use crate::routing_action::RoutingAction;

use super::entry::{BackStackEntry, EntryContent, RoutingConfiguration};

/// How the current entry is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaveMode {
    /// Keep the nodes attached, detach their views.
    DetachView,
    /// Detach the nodes and drop them.
    Destroy,
}

/// Side effects of the backstack actor.
///
/// [`RibConnector`] drives a real node; tests substitute a recorder.
pub trait EntryConnector<C: RoutingConfiguration>: Send + Sync + 'static {
    /// The current entry stops being current.
    fn leave(&self, entry: &BackStackEntry<C>, mode: LeaveMode);

    /// Destroy an entry that is not current.
    fn destroy(&self, entry: &BackStackEntry<C>);

    /// `entry` becomes current: reattach its views or build its nodes.
    fn go_to(&self, entry: &BackStackEntry<C>);

    /// Serialize every live entry to blobs and detach its nodes.
    fn shrink_to_bundles(&self, entries: &[BackStackEntry<C>]) -> Vec<BackStackEntry<C>>;

    /// Final cleanup of the current entry.
    fn tear_down(&self, entries: &[BackStackEntry<C>]);
}

/// Resolves a configuration to its routing action.
pub type Resolver<C> = Arc<dyn Fn(&C) -> Box<dyn RoutingAction> + Send + Sync>;

/// Connects backstack entries to the children of a node.
pub struct RibConnector<C> {
    resolver: Resolver<C>,
    node: Arc<dyn NodeConnector>,
}

impl<C: RoutingConfiguration> RibConnector<C> {
    pub fn new(resolver: Resolver<C>, node: Arc<dyn NodeConnector>) -> Self {
        Self { resolver, node }
    }

    fn routing_action(&self, entry: &BackStackEntry<C>) -> Arc<dyn RoutingAction> {
        if let Some(action) = entry.slot().lock().routing_action.clone() {
            return action;
        }
        let resolved: Arc<dyn RoutingAction> = Arc::from((self.resolver)(entry.configuration()));
        tracing::trace!(target: targets::BACKSTACK, configuration = ?entry.configuration(), "routing action resolved");
        entry
            .slot()
            .lock()
            .routing_action
            .get_or_insert(resolved)
            .clone()
    }

    fn node_factories(&self, entry: &BackStackEntry<C>, action: &dyn RoutingAction) -> Vec<NodeFactory> {
        if let Some(factories) = entry.slot().lock().factories.clone() {
            return factories;
        }
        let factories = action.node_factories();
        entry
            .slot()
            .lock()
            .factories
            .get_or_insert(factories)
            .clone()
    }

    fn take_live_nodes(entry: &BackStackEntry<C>) -> Vec<Arc<Node>> {
        let mut slot = entry.slot().lock();
        match std::mem::take(&mut slot.content) {
            EntryContent::Live(nodes) => nodes,
            pending @ EntryContent::Pending(_) => {
                slot.content = pending;
                Vec::new()
            }
        }
    }

    fn detach_nodes(&self, entry: &BackStackEntry<C>) {
        for node in Self::take_live_nodes(entry) {
            self.node.detach_child(&node);
        }
    }
}

impl<C: RoutingConfiguration> EntryConnector<C> for RibConnector<C> {
    fn leave(&self, entry: &BackStackEntry<C>, mode: LeaveMode) {
        self.routing_action(entry).cleanup();
        match mode {
            LeaveMode::Destroy => self.detach_nodes(entry),
            LeaveMode::DetachView => {
                for node in entry.live_nodes() {
                    node.save_view_state();
                    self.node.detach_child_view(&node);
                }
            }
        }
    }

    fn destroy(&self, entry: &BackStackEntry<C>) {
        self.detach_nodes(entry);
    }

    fn go_to(&self, entry: &BackStackEntry<C>) {
        let action = self.routing_action(entry);
        action.execute();

        let content = entry.slot().lock().content.clone();
        match content {
            EntryContent::Live(nodes) => {
                for node in &nodes {
                    self.node.attach_child_view(node);
                }
            }
            EntryContent::Pending(bundles) => {
                let nodes: Vec<Arc<Node>> = self
                    .node_factories(entry, action.as_ref())
                    .iter()
                    .map(|factory| factory())
                    .collect();
                entry.slot().lock().content = EntryContent::Live(nodes.clone());
                for (index, node) in nodes.into_iter().enumerate() {
                    self.node.attach_child(node, bundles.get(index).cloned());
                }
            }
        }
    }

    fn shrink_to_bundles(&self, entries: &[BackStackEntry<C>]) -> Vec<BackStackEntry<C>> {
        if let Some(current) = entries.last() {
            self.routing_action(current).cleanup();
        }
        for entry in entries {
            let nodes = entry.live_nodes();
            if nodes.is_empty() && !entry.is_live() {
                continue;
            }
            let bundles: Vec<Bundle> = nodes.iter().map(|node| node.save_state()).collect();
            for node in &nodes {
                self.node.detach_child(node);
            }
            entry.slot().lock().content = EntryContent::Pending(bundles);
        }
        entries.to_vec()
    }

    fn tear_down(&self, entries: &[BackStackEntry<C>]) {
        if let Some(current) = entries.last() {
            self.routing_action(current).cleanup();
        }
    }
}
