//! Core systems for Ribs.
//!
//! This crate provides the building blocks of a tree-structured UI component
//! framework:
//!
//! - **Lifecycle Signals**: Monotonic, replay-1 event streams with an active window
//! - **Node Tree**: Attach/detach cascades, state save/restore, back navigation
//! - **Routers**: Per-node controllers deciding which children exist
//! - **Backstack**: A navigation state machine with a pure reducer
//! - **Work Binder**: Background work started and stopped with a lifecycle window
//! - **Workflows**: Deep-link step chains that wait for each node to become active
//!
//! Rendering, dependency injection and platform glue live outside this crate.
//! Platform code feeds lifecycle calls into the root [`Node`] and supplies
//! views through the [`view`] traits.
//!
//! # Node Tree Example
//!
//! ```
//! use std::sync::Arc;
//! use ribs_core::{Interactor, InteractorContext, Node, RibContext, StaticRouter, TracingConfiguration};
//!
//! struct App;
//! impl Interactor for App {}
//!
//! struct Banner;
//! impl Interactor for Banner {
//!     fn did_become_active(&self, context: &InteractorContext, _: Option<&ribs_core::Bundle>) {
//!         tracing::info!(tag = context.tag(), "banner shown");
//!     }
//! }
//!
//! let context = RibContext::builder()
//!     .configuration(Arc::new(TracingConfiguration))
//!     .build();
//! let banner_context = context.clone();
//! let router = StaticRouter::new().with_part(move || {
//!     Node::builder(Arc::new(Banner)).context(banner_context.clone()).build()
//! });
//! let root = Node::builder(Arc::new(App))
//!     .router(Arc::new(router))
//!     .context(context)
//!     .build();
//!
//! root.attach(None);
//! assert_eq!(root.children()[0].tag(), "Banner");
//!
//! let saved = root.save_state();
//! root.detach();
//! assert!(saved.get_bundle(ribs_core::bundle::keys::CHILDREN).is_some());
//! ```
//!
//! # Work Binder Example
//!
//! ```
//! use std::sync::Arc;
//! use ribs_core::{from_fn, InteractorEvent, LifecycleSignal, TaskScope, WorkBinder};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let lifecycle = Arc::new(LifecycleSignal::new());
//! lifecycle.emit(InteractorEvent::Active).unwrap();
//!
//! let handle = WorkBinder::bind(
//!     &TaskScope::current(),
//!     Arc::new(from_fn(|_scope| async { Ok(()) })),
//!     &lifecycle,
//! )
//! .unwrap();
//! handle.join().await.unwrap();
//! handle.unbind().unwrap();
//! # }
//! ```

pub mod backstack;
pub mod bundle;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod interactor;
pub mod lifecycle;
pub mod logging;
pub mod node;
pub mod ref_watcher;
pub mod router;
pub mod routing_action;
pub mod scope;
pub mod signal;
mod thread_check;
pub mod view;
pub mod worker;
pub mod workflow;

pub use backstack::{
    reduce, BackStackEntry, BackStackManager, BackStackRouter, BackStackState, Effect,
    EntryConnector, Intent, LeaveMode, RibConnector, RoutingConfiguration,
};
pub use bundle::{Bundle, BundleValue};
pub use config::{
    configuration, set_configuration, Configuration, DefaultConfiguration,
    RecordingConfiguration, TracingConfiguration,
};
pub use context::{RibContext, RibContextBuilder};
pub use error::{
    BundleError, ConfigError, LifecycleError, Result, RibError, WorkerError,
};
pub use events::{NodeInfo, RibAction, RibActionEvent, RibActionState, RibEvents, RouterEvent, RouterEventKind};
pub use interactor::{Interactor, InteractorContext, Presenter};
pub use lifecycle::{InteractorEvent, LifecycleEvent, LifecycleSignal, PresenterEvent};
pub use node::{Node, NodeBuilder, NodeFactory, NodeHandle, NodeId, NodeState};
pub use ref_watcher::{Breadcrumb, RefWatcher, ReferenceWatcher, WeakLeakAuditor};
pub use router::{NodeConnector, Router, StaticRouter};
pub use routing_action::{
    node_factory, AttachNodes, CompositeRoutingAction, InvokeOnExecute, NoOpRoutingAction,
    RoutingAction,
};
pub use scope::{ErrorSink, TaskScope};
pub use signal::{ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
pub use view::{ContainerRef, RibView, ViewContainer, ViewFactory, ViewRef};
pub use worker::{from_fn, BindWorkerHandle, FnWorker, StopCause, WorkBinder, Worker};
pub use workflow::{ActionableItem, Step, StepData, Workflow};

mod assertions {
    use static_assertions::assert_impl_all;

    assert_impl_all!(super::Node: Send, Sync);
    assert_impl_all!(super::NodeHandle: Send, Sync, Clone);
    assert_impl_all!(super::RibContext: Send, Sync, Clone);
    assert_impl_all!(super::LifecycleSignal<super::InteractorEvent>: Send, Sync);
    assert_impl_all!(super::BackStackManager<String>: Send, Sync);
    assert_impl_all!(super::BackStackRouter<String>: Send, Sync);
    assert_impl_all!(super::TaskScope: Send, Sync, Clone);
    assert_impl_all!(super::BindWorkerHandle: Send, Sync);
    assert_impl_all!(super::Bundle: Send, Sync, Clone);
    assert_impl_all!(super::WorkerError: Send, Sync, Clone);
}
