use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bundle::Bundle;
use crate::node::{Node, NodeFactory};
use crate::routing_action::RoutingAction;

/// A navigation configuration: a value compared by equality.
pub trait RoutingConfiguration: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> RoutingConfiguration for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// Either live nodes or the blobs they were serialized to. Never both.
#[derive(Clone)]
pub(crate) enum EntryContent {
    Pending(Vec<Bundle>),
    Live(Vec<Arc<Node>>),
}

impl Default for EntryContent {
    fn default() -> Self {
        EntryContent::Pending(Vec::new())
    }
}

#[derive(Default)]
pub(crate) struct EntrySlot {
    /// Resolved at most once.
    pub(crate) routing_action: Option<Arc<dyn RoutingAction>>,
    /// Asked for at most once.
    pub(crate) factories: Option<Vec<NodeFactory>>,
    pub(crate) content: EntryContent,
}

/// One configuration on the stack, with its resolution and nodes.
///
/// Clones share the same slot; an entry keeps its identity across state
/// transitions.
pub struct BackStackEntry<C> {
    configuration: C,
    slot: Arc<Mutex<EntrySlot>>,
}

impl<C: Clone> Clone for BackStackEntry<C> {
    fn clone(&self) -> Self {
        Self {
            configuration: self.configuration.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for BackStackEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = match &self.slot.lock().content {
            EntryContent::Pending(bundles) => format!("pending({})", bundles.len()),
            EntryContent::Live(nodes) => format!("live({})", nodes.len()),
        };
        f.debug_struct("BackStackEntry")
            .field("configuration", &self.configuration)
            .field("content", &content)
            .finish()
    }
}

impl<C: RoutingConfiguration> BackStackEntry<C> {
    pub fn new(configuration: C) -> Self {
        Self::restored(configuration, Vec::new())
    }

    /// An entry whose nodes will be rebuilt from `bundles`, positionally.
    pub fn restored(configuration: C, bundles: Vec<Bundle>) -> Self {
        Self {
            configuration,
            slot: Arc::new(Mutex::new(EntrySlot {
                content: EntryContent::Pending(bundles),
                ..EntrySlot::default()
            })),
        }
    }

    pub fn configuration(&self) -> &C {
        &self.configuration
    }

    pub fn is_live(&self) -> bool {
        matches!(self.slot.lock().content, EntryContent::Live(_))
    }

    /// Live nodes; empty while serialized.
    pub fn live_nodes(&self) -> Vec<Arc<Node>> {
        match &self.slot.lock().content {
            EntryContent::Live(nodes) => nodes.clone(),
            EntryContent::Pending(_) => Vec::new(),
        }
    }

    /// Serialized blobs; empty while live.
    pub fn bundles(&self) -> Vec<Bundle> {
        match &self.slot.lock().content {
            EntryContent::Pending(bundles) => bundles.clone(),
            EntryContent::Live(_) => Vec::new(),
        }
    }

    /// Blobs for persisting this entry without changing it.
    pub fn snapshot_bundles(&self) -> Vec<Bundle> {
        let content = self.slot.lock().content.clone();
        match content {
            EntryContent::Pending(bundles) => bundles,
            EntryContent::Live(nodes) => nodes.iter().map(|node| node.save_state()).collect(),
        }
    }

    /// Whether `other` is this very entry, not just an equal configuration.
    pub fn same_entry(&self, other: &BackStackEntry<C>) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    pub(crate) fn slot(&self) -> &Mutex<EntrySlot> {
        &self.slot
    }
}

/// The navigation stack. The last entry is current.
pub struct BackStackState<C> {
    entries: Vec<BackStackEntry<C>>,
}

impl<C: Clone> Clone for BackStackState<C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<C> Default for BackStackState<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for BackStackState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

impl<C: RoutingConfiguration> BackStackState<C> {
    pub fn new(entries: Vec<BackStackEntry<C>>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BackStackEntry<C>] {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<BackStackEntry<C>> {
        self.entries
    }

    pub fn current(&self) -> Option<&BackStackEntry<C>> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_pop(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn configurations(&self) -> Vec<C> {
        self.entries
            .iter()
            .map(|entry| entry.configuration.clone())
            .collect()
    }
}
