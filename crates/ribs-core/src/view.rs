//! View boundary.
//!
//! The core never renders anything. It asks a [`ViewFactory`] for a view when
//! a node is attached to a parent container, and hands the view back to the
//! container when the node leaves it. Per-view hierarchy state is saved into
//! and restored from a [`Bundle`] independently of the node's own state.

use std::sync::Arc;

use crate::bundle::Bundle;

/// Something views can be added to.
pub trait ViewContainer: Send + Sync + 'static {
    fn add_view(&self, _view: &ViewRef) {}

    fn remove_view(&self, _view: &ViewRef) {}
}

/// A view owned by a node.
///
/// Views are containers for the views of their node's children; leaf views
/// keep the no-op [`ViewContainer`] defaults.
pub trait RibView: ViewContainer {
    /// Save per-view hierarchy state (scroll offsets, focus, input text).
    fn save_hierarchy_state(&self, _out: &mut Bundle) {}

    fn restore_hierarchy_state(&self, _state: &Bundle) {}
}

pub type ViewRef = Arc<dyn RibView>;
pub type ContainerRef = Arc<dyn ViewContainer>;

/// Creates a node's view inside its parent container.
pub trait ViewFactory: Send + Sync + 'static {
    fn create_view(&self, parent: &ContainerRef) -> ViewRef;
}

impl<F> ViewFactory for F
where
    F: Fn(&ContainerRef) -> ViewRef + Send + Sync + 'static,
{
    fn create_view(&self, parent: &ContainerRef) -> ViewRef {
        self(parent)
    }
}
