//! Synchronous observer lists.
//!
//! A [`Signal`] fans a value out to every connected observer, in connection
//! order. Lifecycle signals and the [`RibEvents`](crate::events::RibEvents)
//! streams are built on it.
//!
//! Observers run without any lock held. An observer may therefore connect,
//! disconnect itself or emit again on the same signal. A nested emit is queued
//! and delivered after the outer value has reached every observer, so all
//! observers see values in the same order.
//!
//! ```
//! use ribs_core::signal::Signal;
//!
//! let attached = Signal::<String>::new();
//! let id = attached.connect(|tag| println!("attached {tag}"));
//! attached.emit("inbox".to_string());
//! assert!(attached.disconnect(id));
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Handle returned by [`Signal::connect`].
    pub struct ConnectionId;
}

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Delivery<T> {
    backlog: VecDeque<T>,
    delivering: bool,
}

/// Observer list delivering values of type `T`.
pub struct Signal<T> {
    observers: Mutex<SlotMap<ConnectionId, Observer<T>>>,
    delivery: Mutex<Delivery<T>>,
}

impl<T: Send + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(SlotMap::with_key()),
            delivery: Mutex::new(Delivery {
                backlog: VecDeque::new(),
                delivering: false,
            }),
        }
    }

    pub fn connect<F>(&self, observer: F) -> ConnectionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.observers.lock().insert(Arc::new(observer))
    }

    /// Returns `false` if `id` was already disconnected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.observers.lock().remove(id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Deliver `value` to every observer.
    ///
    /// Called from inside an observer, the value joins the backlog of the
    /// running delivery and this call returns at once.
    #[tracing::instrument(skip_all, target = "ribs_core::signal", level = "trace")]
    pub fn emit(&self, value: T) {
        {
            let mut delivery = self.delivery.lock();
            delivery.backlog.push_back(value);
            if delivery.delivering {
                tracing::trace!(target: targets::SIGNAL, "nested emit deferred");
                return;
            }
            delivery.delivering = true;
        }

        let _guard = DeliveryGuard(&self.delivery);
        while let Some(value) = self.next_value() {
            let observers: Vec<Observer<T>> = self.observers.lock().values().cloned().collect();
            tracing::trace!(target: targets::SIGNAL, observers = observers.len(), "delivering");
            for observer in &observers {
                observer(&value);
            }
        }
    }

    fn next_value(&self) -> Option<T> {
        self.delivery.lock().backlog.pop_front()
    }
}

/// Ends a delivery loop, dropping the backlog if an observer panicked.
struct DeliveryGuard<'a, T>(&'a Mutex<Delivery<T>>);

impl<T> Drop for DeliveryGuard<'_, T> {
    fn drop(&mut self) {
        let mut delivery = self.0.lock();
        delivery.delivering = false;
        if std::thread::panicking() {
            delivery.backlog.clear();
        }
    }
}
