//! Business logic and presentation capabilities.
//!
//! Application code implements [`Interactor`] (and optionally [`Presenter`])
//! overriding only the callbacks it needs. The framework owns the lifecycle
//! signals and drives the callbacks from the node tree:
//!
//! | Node operation   | Interactor callbacks                                   |
//! |------------------|--------------------------------------------------------|
//! | attach           | `Active`, presenter `Loaded`, `did_become_active`      |
//! | detach           | presenter `Unloaded`, `will_resign_active`, `Inactive` |
//! | attach to view   | `on_view_created`                                      |
//! | detach from view | `on_view_destroyed`                                    |
//! | save state       | `on_save_instance_state`                               |
//!
//! # Example
//!
//! ```
//! use ribs_core::interactor::{Interactor, InteractorContext};
//! use ribs_core::bundle::Bundle;
//!
//! struct Inbox;
//!
//! impl Interactor for Inbox {
//!     fn did_become_active(&self, context: &InteractorContext, saved: Option<&Bundle>) {
//!         let unread = saved.and_then(|b| b.get_integer("unread")).unwrap_or(0);
//!         tracing::info!(tag = context.tag(), unread, "inbox active");
//!     }
//!
//!     fn on_save_instance_state(&self, out: &mut Bundle) {
//!         out.put("unread", 3);
//!     }
//! }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::bundle::{keys, Bundle};
use crate::events::{RibAction, RibActionState};
use crate::lifecycle::{InteractorEvent, LifecycleSignal, PresenterEvent};
use crate::node::{Node, NodeHandle};
use crate::view::ViewRef;

/// Business logic of a node.
pub trait Interactor: Send + Sync + 'static {
    /// The node was attached. `saved_state` is what
    /// [`on_save_instance_state`](Self::on_save_instance_state) wrote last time.
    fn did_become_active(&self, _context: &InteractorContext, _saved_state: Option<&Bundle>) {}

    /// The node is being detached.
    fn will_resign_active(&self) {}

    /// Return `true` to consume a back navigation.
    fn handle_back_press(&self) -> bool {
        false
    }

    fn on_save_instance_state(&self, _out: &mut Bundle) {}

    fn on_view_created(&self, _view: &ViewRef) {}

    fn on_view_destroyed(&self) {}

    fn on_start(&self) {}

    fn on_stop(&self) {}

    fn on_resume(&self) {}

    fn on_pause(&self) {}
}

/// Presentation logic of a node.
pub trait Presenter: Send + Sync + 'static {
    fn did_load(&self, _lifecycle: &Arc<LifecycleSignal<PresenterEvent>>) {}

    fn will_unload(&self) {}
}

/// What an interactor gets to see when it becomes active.
#[derive(Clone)]
pub struct InteractorContext {
    tag: String,
    lifecycle: Arc<LifecycleSignal<InteractorEvent>>,
    node: NodeHandle,
}

impl InteractorContext {
    /// Stable tag, preserved across save/restore.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Lifecycle to bind workers to.
    pub fn lifecycle(&self) -> &Arc<LifecycleSignal<InteractorEvent>> {
        &self.lifecycle
    }

    /// The owning node, for attaching children dynamically.
    pub fn node(&self) -> &NodeHandle {
        &self.node
    }
}

/// Framework side of a node's business logic.
pub(crate) struct InteractorHost {
    logic: Arc<dyn Interactor>,
    presenter: Option<Arc<dyn Presenter>>,
    lifecycle: Arc<LifecycleSignal<InteractorEvent>>,
    presenter_lifecycle: Arc<LifecycleSignal<PresenterEvent>>,
    tag: Mutex<String>,
}

impl InteractorHost {
    pub(crate) fn new(
        logic: Arc<dyn Interactor>,
        presenter: Option<Arc<dyn Presenter>>,
        tag: String,
    ) -> Self {
        Self {
            logic,
            presenter,
            lifecycle: Arc::new(LifecycleSignal::new()),
            presenter_lifecycle: Arc::new(LifecycleSignal::new()),
            tag: Mutex::new(tag),
        }
    }

    pub(crate) fn logic(&self) -> &Arc<dyn Interactor> {
        &self.logic
    }

    pub(crate) fn lifecycle(&self) -> &Arc<LifecycleSignal<InteractorEvent>> {
        &self.lifecycle
    }

    pub(crate) fn presenter_lifecycle(&self) -> &Arc<LifecycleSignal<PresenterEvent>> {
        &self.presenter_lifecycle
    }

    pub(crate) fn tag(&self) -> String {
        self.tag.lock().clone()
    }

    pub(crate) fn dispatch_attach(&self, node: &Node, saved_state: Option<&Bundle>) {
        let context = node.context();
        if let Some(tag) = saved_state.and_then(|b| b.get_str(keys::INTERACTOR_TAG)) {
            *self.tag.lock() = tag.to_string();
        }

        if let Err(err) = self.lifecycle.emit(InteractorEvent::Active) {
            context.report_error(&format!("Interactor of `{}` cannot become active: {err}", node.tag()));
            return;
        }

        if let Some(presenter) = &self.presenter {
            match self.presenter_lifecycle.emit(PresenterEvent::Loaded) {
                Ok(()) => presenter.did_load(&self.presenter_lifecycle),
                Err(err) => context.report_error(&format!("Presenter of `{}` cannot load: {err}", node.tag())),
            }
        }

        let interactor_context = InteractorContext {
            tag: self.tag(),
            lifecycle: self.lifecycle.clone(),
            node: node.handle(),
        };
        let events = context.events();
        events.emit_action(node, RibAction::DidBecomeActive, RibActionState::Started);
        self.logic.did_become_active(&interactor_context, saved_state);
        events.emit_action(node, RibAction::DidBecomeActive, RibActionState::Completed);
    }

    pub(crate) fn dispatch_detach(&self, node: &Node) {
        let context = node.context();
        if let Some(presenter) = &self.presenter {
            if self.presenter_lifecycle.is_active() {
                presenter.will_unload();
                if let Err(err) = self.presenter_lifecycle.emit(PresenterEvent::Unloaded) {
                    context.report_error(&format!("Presenter of `{}` cannot unload: {err}", node.tag()));
                }
            }
        }

        let events = context.events();
        events.emit_action(node, RibAction::WillResignActive, RibActionState::Started);
        self.logic.will_resign_active();
        events.emit_action(node, RibAction::WillResignActive, RibActionState::Completed);

        if let Err(err) = self.lifecycle.emit(InteractorEvent::Inactive) {
            context.report_error(&format!("Interactor of `{}` cannot resign: {err}", node.tag()));
        }
    }

    pub(crate) fn save_instance_state(&self) -> Bundle {
        let mut out = Bundle::new();
        self.logic.on_save_instance_state(&mut out);
        out.put(keys::INTERACTOR_TAG, self.tag());
        out
    }
}
