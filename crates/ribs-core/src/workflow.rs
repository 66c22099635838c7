//! Deep-link workflows.
//!
//! A workflow drives the node tree through a chain of [`Step`]s, for example
//! "open the inbox, then open thread 42". Each step resolves to a value and
//! the [`ActionableItem`] the next step acts on. Before the next step runs,
//! the item's interactor must be active, so a step may return a node that its
//! router is still about to attach.
//!
//! A step that resolves to nothing halts the chain. So does an item whose
//! lifecycle has already ended by the time the chain gets to it.
//!
//! ```
//! use std::sync::Arc;
//! use ribs_core::lifecycle::{InteractorEvent, LifecycleSignal};
//! use ribs_core::workflow::{Step, StepData};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let inbox = Arc::new(LifecycleSignal::new());
//! inbox.emit(InteractorEvent::Active).unwrap();
//!
//! let opened = Step::ready(StepData::new(3usize, inbox))
//!     .on_step(|unread, item| Step::ready(StepData::new(format!("{unread} unread"), item)))
//!     .result()
//!     .await;
//! assert_eq!(opened.as_deref(), Some("3 unread"));
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;

use crate::interactor::InteractorContext;
use crate::lifecycle::{InteractorEvent, LifecycleSignal};
use crate::logging::targets;
use crate::node::Node;

/// Something a workflow step can act on once its interactor is active.
pub trait ActionableItem: Send + Sync + 'static {
    fn lifecycle(&self) -> Arc<LifecycleSignal<InteractorEvent>>;
}

impl ActionableItem for Arc<LifecycleSignal<InteractorEvent>> {
    fn lifecycle(&self) -> Arc<LifecycleSignal<InteractorEvent>> {
        self.clone()
    }
}

impl ActionableItem for Arc<Node> {
    fn lifecycle(&self) -> Arc<LifecycleSignal<InteractorEvent>> {
        self.interactor_lifecycle().clone()
    }
}

impl ActionableItem for InteractorContext {
    fn lifecycle(&self) -> Arc<LifecycleSignal<InteractorEvent>> {
        InteractorContext::lifecycle(self).clone()
    }
}

/// What a step resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct StepData<T, A> {
    pub value: T,
    pub item: A,
}

impl<T, A> StepData<T, A> {
    pub fn new(value: T, item: A) -> Self {
        Self { value, item }
    }
}

impl<A> StepData<(), A> {
    /// Move on to `item` without producing a value.
    pub fn to_item(item: A) -> Self {
        Self::new((), item)
    }
}

/// One link of a workflow chain.
#[must_use = "a step does nothing until it is awaited"]
pub struct Step<T, A> {
    data: BoxFuture<'static, Option<StepData<T, A>>>,
}

impl<T, A> Step<T, A>
where
    T: Send + 'static,
    A: ActionableItem,
{
    /// A step that always produces data.
    pub fn from_future<F>(data: F) -> Self
    where
        F: Future<Output = StepData<T, A>> + Send + 'static,
    {
        Self::from_optional(data.map(Some))
    }

    /// A step that resolves to `None` when it cannot move forward.
    pub fn from_optional<F>(data: F) -> Self
    where
        F: Future<Output = Option<StepData<T, A>>> + Send + 'static,
    {
        Self { data: data.boxed() }
    }

    pub fn ready(data: StepData<T, A>) -> Self {
        Self::from_optional(future::ready(Some(data)))
    }

    /// A step that halts the chain.
    pub fn halt() -> Self {
        Self::from_optional(future::ready(None))
    }

    /// Chain `next` after this step.
    ///
    /// `next` gets this step's value and item once the item is active. It is
    /// never called if this step halts.
    pub fn on_step<T2, A2, F>(self, next: F) -> Step<T2, A2>
    where
        T2: Send + 'static,
        A2: ActionableItem,
        F: FnOnce(T, A) -> Step<T2, A2> + Send + 'static,
    {
        Step::from_optional(async move {
            let StepData { value, item } = self.resolve().await?;
            next(value, item).resolve().await
        })
    }

    /// Run the step and wait for its item's interactor to be active.
    pub async fn resolve(self) -> Option<StepData<T, A>> {
        let data = self.data.await?;
        let lifecycle = data.item.lifecycle();
        match lifecycle.await_opening_event().await {
            Ok(_) => Some(data),
            Err(err) => {
                tracing::debug!(target: targets::WORKFLOW, %err, "step item will never be active, halting");
                None
            }
        }
    }

    /// Like [`resolve`](Self::resolve), keeping only the value.
    pub async fn result(self) -> Option<T> {
        self.resolve().await.map(|data| data.value)
    }
}

/// A named chain of steps started from a root item.
pub trait Workflow: Send + Sync {
    type Root: ActionableItem;
    type Output: Send + 'static;
    type Last: ActionableItem;

    fn steps(&self, root: Self::Root) -> Step<Self::Output, Self::Last>;

    /// Run every step, returning the last value unless the chain halted.
    fn run(&self, root: Self::Root) -> impl Future<Output = Option<Self::Output>> + Send {
        let steps = self.steps(root);
        tracing::debug!(target: targets::WORKFLOW, "workflow started");
        steps.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn active() -> Arc<LifecycleSignal<InteractorEvent>> {
        let lifecycle = Arc::new(LifecycleSignal::new());
        lifecycle.emit(InteractorEvent::Active).unwrap();
        lifecycle
    }

    #[tokio::test]
    async fn test_step_waits_for_item_to_become_active() {
        let item = Arc::new(LifecycleSignal::<InteractorEvent>::new());
        let pending = tokio::spawn(Step::ready(StepData::new(7, item.clone())).result());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        item.emit(InteractorEvent::Active).unwrap();
        assert_eq!(pending.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_active_item_resolves_without_waiting() {
        let data = Step::ready(StepData::to_item(active())).resolve().await;
        assert!(data.is_some_and(|data| data.item.is_active()));
    }

    #[tokio::test]
    async fn test_chained_step_receives_previous_value() {
        let result = Step::from_future(async { StepData::new("inbox", active()) })
            .on_step(|screen, item| Step::ready(StepData::new(format!("{screen}/42"), item)))
            .result()
            .await;

        assert_eq!(result.as_deref(), Some("inbox/42"));
    }

    #[tokio::test]
    async fn test_halted_step_skips_the_rest_of_the_chain() {
        let called = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = called.clone();

        let result = Step::<u8, Arc<LifecycleSignal<InteractorEvent>>>::halt()
            .on_step(move |_, item| {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Step::ready(StepData::new(1u8, item))
            })
            .result()
            .await;

        assert_eq!(result, None);
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_ended_item_halts() {
        let item = active();
        item.emit(InteractorEvent::Inactive).unwrap();

        assert_eq!(Step::ready(StepData::new((), item)).result().await, None);
    }
}
