use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bundle::Bundle;
use crate::context::RibContext;
use crate::logging::targets;
use crate::node::{NodeFactory, NodeHandle};
use crate::router::Router;
use crate::routing_action::RoutingAction;

use super::connector::{Resolver, RibConnector};
use super::entry::RoutingConfiguration;
use super::manager::BackStackManager;

struct Attached<C: RoutingConfiguration> {
    manager: Arc<BackStackManager<C>>,
    context: RibContext,
}

/// A [`Router`] whose children follow a navigation backstack.
///
/// The manager is created when the node attaches, from the router's saved
/// state if there is any, and torn down when it detaches. Navigation calls
/// made while the node is not attached are dropped with a warning.
///
/// ```
/// use std::sync::Arc;
/// use ribs_core::backstack::BackStackRouter;
/// use ribs_core::context::RibContext;
/// use ribs_core::interactor::Interactor;
/// use ribs_core::node::Node;
/// use ribs_core::routing_action::{AttachNodes, NoOpRoutingAction, RoutingAction};
///
/// #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// enum Screen {
///     Home,
///     Settings,
/// }
///
/// struct Shell;
/// impl Interactor for Shell {}
/// struct Settings;
/// impl Interactor for Settings {}
///
/// let context = RibContext::builder().build();
/// let child_context = context.clone();
/// let router = Arc::new(BackStackRouter::new(Screen::Home, move |screen: &Screen| -> Box<dyn RoutingAction> {
///     match screen {
///         Screen::Home => Box::new(NoOpRoutingAction),
///         Screen::Settings => {
///             let context = child_context.clone();
///             Box::new(AttachNodes::single(move || {
///                 Node::builder(Arc::new(Settings)).context(context.clone()).build()
///             }))
///         }
///     }
/// }));
///
/// let shell = Node::builder(Arc::new(Shell)).router(router.clone()).context(context).build();
/// shell.attach(None);
///
/// router.push(Screen::Settings);
/// assert_eq!(router.configurations(), vec![Screen::Home, Screen::Settings]);
/// assert!(shell.handle_back_press());
/// assert_eq!(router.configurations(), vec![Screen::Home]);
/// ```
pub struct BackStackRouter<C: RoutingConfiguration> {
    initial: C,
    resolver: Resolver<C>,
    permanent_parts: Vec<NodeFactory>,
    attached: RwLock<Option<Attached<C>>>,
}

impl<C> BackStackRouter<C>
where
    C: RoutingConfiguration + Serialize + DeserializeOwned,
{
    pub fn new<F>(initial: C, resolver: F) -> Self
    where
        F: Fn(&C) -> Box<dyn RoutingAction> + Send + Sync + 'static,
    {
        Self {
            initial,
            resolver: Arc::new(resolver),
            permanent_parts: Vec::new(),
            attached: RwLock::new(None),
        }
    }

    /// Children attached next to the backstack's, on every attach.
    pub fn with_permanent_parts(mut self, parts: Vec<NodeFactory>) -> Self {
        self.permanent_parts = parts;
        self
    }

    /// The manager, once the node is attached.
    pub fn manager(&self) -> Option<Arc<BackStackManager<C>>> {
        self.attached
            .read()
            .as_ref()
            .map(|attached| attached.manager.clone())
    }

    pub fn push(&self, configuration: C) {
        self.with_manager("push", |manager| manager.push(configuration));
    }

    pub fn replace(&self, configuration: C) {
        self.with_manager("replace", |manager| manager.replace(configuration));
    }

    pub fn new_root(&self, configuration: C) {
        self.with_manager("new_root", |manager| manager.new_root(configuration));
    }

    /// Serialize every entry's nodes to blobs and detach them.
    pub fn shrink_to_bundles(&self) {
        self.with_manager("shrink_to_bundles", |manager| manager.shrink_to_bundles());
    }

    pub fn configurations(&self) -> Vec<C> {
        self.manager()
            .map(|manager| manager.configurations())
            .unwrap_or_default()
    }

    pub fn current_configuration(&self) -> Option<C> {
        self.manager()
            .and_then(|manager| manager.current_configuration())
    }

    pub fn can_pop(&self) -> bool {
        self.manager().is_some_and(|manager| manager.can_pop())
    }

    fn with_manager(&self, operation: &str, f: impl FnOnce(&BackStackManager<C>)) {
        match self.manager() {
            Some(manager) => f(&manager),
            None => tracing::warn!(
                target: targets::ROUTER,
                operation,
                "navigation while the router is not attached is dropped"
            ),
        }
    }
}

impl<C> Router for BackStackRouter<C>
where
    C: RoutingConfiguration + Serialize + DeserializeOwned,
{
    fn on_attach(&self, node: &NodeHandle, saved_state: Option<&Bundle>) {
        let Some(owner) = node.node() else {
            return;
        };
        let context = owner.context().clone();
        if self.attached.read().is_some() {
            context.report_error("Router was already attached");
            return;
        }

        let entries = match saved_state.map(BackStackManager::<C>::restore_entries).transpose() {
            Ok(entries) => entries.unwrap_or_default(),
            Err(err) => {
                context.report_warning(&format!("Backstack state could not be restored: {err}"));
                Vec::new()
            }
        };
        tracing::debug!(target: targets::ROUTER, restored = entries.len(), tag = owner.tag(), "backstack router attached");

        let connector = Arc::new(RibConnector::new(self.resolver.clone(), Arc::new(node.clone())));
        let manager = Arc::new(BackStackManager::unstarted(self.initial.clone(), entries, connector));
        *self.attached.write() = Some(Attached {
            manager: manager.clone(),
            context,
        });
        manager.bootstrap();
    }

    fn on_detach(&self, _node: &NodeHandle) {
        let attached = self.attached.write().take();
        if let Some(attached) = attached {
            attached.manager.tear_down();
        }
    }

    fn on_save_instance_state(&self, out: &mut Bundle) {
        let (manager, context) = match self.attached.read().as_ref() {
            Some(attached) => (attached.manager.clone(), attached.context.clone()),
            None => return,
        };
        if let Err(err) = manager.save_state(out) {
            context.report_warning(&format!("Backstack state could not be saved: {err}"));
        }
    }

    fn permanent_parts(&self) -> Vec<NodeFactory> {
        self.permanent_parts.clone()
    }

    fn pop_back_stack(&self) -> bool {
        match self.manager() {
            Some(manager) if manager.can_pop() => {
                manager.pop();
                true
            }
            _ => false,
        }
    }
}
