//! Ribs - a tree-structured UI component lifecycle framework.
//!
//! This is the main umbrella crate that re-exports all public APIs.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ribs::prelude::*;
//!
//! struct Root;
//! impl Interactor for Root {}
//!
//! let context = RibContext::builder()
//!     .configuration(Arc::new(TracingConfiguration))
//!     .build();
//! let root = Node::builder(Arc::new(Root)).context(context).build();
//! root.attach(None);
//! assert!(root.interactor_lifecycle().is_active());
//! root.detach();
//! ```

pub use ribs_core::*;

/// Everything an application module usually needs.
pub mod prelude {
    pub use ribs_core::backstack::{BackStackRouter, Intent};
    pub use ribs_core::bundle::Bundle;
    pub use ribs_core::config::{Configuration, TracingConfiguration};
    pub use ribs_core::context::RibContext;
    pub use ribs_core::error::{LifecycleError, WorkerError};
    pub use ribs_core::interactor::{Interactor, InteractorContext, Presenter};
    pub use ribs_core::lifecycle::{InteractorEvent, LifecycleSignal, PresenterEvent};
    pub use ribs_core::node::{Node, NodeHandle};
    pub use ribs_core::router::{NodeConnector, Router, StaticRouter};
    pub use ribs_core::routing_action::{AttachNodes, NoOpRoutingAction, RoutingAction};
    pub use ribs_core::scope::TaskScope;
    pub use ribs_core::view::{ContainerRef, RibView, ViewContainer, ViewRef};
    pub use ribs_core::worker::{BindWorkerHandle, StopCause, WorkBinder, Worker};
    pub use ribs_core::workflow::{ActionableItem, Step, StepData, Workflow};
}
