//! Lifecycle signals.
//!
//! A [`LifecycleSignal`] holds a single "current event" drawn from an ordered
//! enum implementing [`LifecycleEvent`]. It only ever moves forward; the
//! window between [`LifecycleEvent::OPENING`] (inclusive) and
//! [`LifecycleEvent::CLOSING`] (exclusive) is the component's active window.
//!
//! Two event kinds ship with the crate:
//!
//! - [`InteractorEvent`] (`Active` → `Inactive`) for business logic.
//! - [`PresenterEvent`] (`Loaded` → `Unloaded`) for presentation.
//!
//! Subscribers receive the most recent event immediately on subscription and
//! every later event in emission order. Nothing older than the last event is
//! replayed.
//!
//! # Example
//!
//! ```
//! use ribs_core::lifecycle::{InteractorEvent, LifecycleSignal};
//! use ribs_core::error::LifecycleError;
//!
//! let lifecycle = LifecycleSignal::<InteractorEvent>::new();
//! assert_eq!(lifecycle.ensure_alive(), Err(LifecycleError::NotStarted));
//!
//! lifecycle.emit(InteractorEvent::Active).unwrap();
//! assert!(lifecycle.is_active());
//!
//! lifecycle.emit(InteractorEvent::Inactive).unwrap();
//! assert_eq!(lifecycle.ensure_alive(), Err(LifecycleError::AlreadyEnded));
//! assert!(lifecycle.emit(InteractorEvent::Active).is_err());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::LifecycleError;
use crate::logging::targets;
use crate::signal::{ConnectionId, Signal};

/// An ordered lifecycle event enum with an opening and a closing boundary.
pub trait LifecycleEvent: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// First event of the active window.
    const OPENING: Self;
    /// Event that closes the active window. Terminal.
    const CLOSING: Self;

    /// The closing event corresponding to `self`.
    ///
    /// Fails with [`LifecycleError::AlreadyEnded`] if `self` is already at or
    /// past the closing boundary.
    fn corresponding(self) -> Result<Self, LifecycleError> {
        if self < Self::CLOSING {
            Ok(Self::CLOSING)
        } else {
            Err(LifecycleError::AlreadyEnded)
        }
    }
}

/// Lifecycle of a business-logic component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InteractorEvent {
    /// The component became active (its node was attached).
    Active,
    /// The component resigned (its node was detached).
    Inactive,
}

impl LifecycleEvent for InteractorEvent {
    const OPENING: Self = InteractorEvent::Active;
    const CLOSING: Self = InteractorEvent::Inactive;
}

/// Lifecycle of a presentation component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PresenterEvent {
    Loaded,
    Unloaded,
}

impl LifecycleEvent for PresenterEvent {
    const OPENING: Self = PresenterEvent::Loaded;
    const CLOSING: Self = PresenterEvent::Unloaded;
}

/// A monotonic, replay-1 lifecycle event stream.
pub struct LifecycleSignal<E: LifecycleEvent> {
    /// Last emitted event; `None` until started.
    state: watch::Sender<Option<E>>,
    /// Synchronous observers.
    observers: Signal<E>,
}

impl<E: LifecycleEvent> Default for LifecycleSignal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LifecycleEvent> fmt::Debug for LifecycleSignal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSignal")
            .field("current", &self.current())
            .field("observers", &self.observers.observer_count())
            .finish()
    }
}

impl<E: LifecycleEvent> LifecycleSignal<E> {
    /// Create a signal that has not started.
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            observers: Signal::new(),
        }
    }

    /// The last emitted event, or `None` if the signal has not started.
    pub fn current(&self) -> Option<E> {
        *self.state.borrow()
    }

    /// Whether the signal is inside its active window.
    pub fn is_active(&self) -> bool {
        self.ensure_alive().is_ok()
    }

    /// Whether the closing event has been reached.
    pub fn has_ended(&self) -> bool {
        matches!(self.current(), Some(e) if e >= E::CLOSING)
    }

    /// Check that the signal is inside its active window.
    pub fn ensure_alive(&self) -> Result<(), LifecycleError> {
        match self.current() {
            None => Err(LifecycleError::NotStarted),
            Some(e) if e < E::OPENING => Err(LifecycleError::NotStarted),
            Some(e) if e >= E::CLOSING => Err(LifecycleError::AlreadyEnded),
            Some(_) => Ok(()),
        }
    }

    /// Emit the next event.
    ///
    /// The event must be strictly after the current one. Observers are
    /// invoked synchronously.
    pub fn emit(&self, event: E) -> Result<(), LifecycleError> {
        let mut rejected = None;
        self.state.send_if_modified(|current| match *current {
            Some(last) if event <= last => {
                rejected = Some(last);
                false
            }
            _ => {
                *current = Some(event);
                true
            }
        });

        if let Some(last) = rejected {
            return Err(LifecycleError::OutOfOrder {
                current: format!("{last:?}"),
                attempted: format!("{event:?}"),
            });
        }

        tracing::trace!(target: targets::LIFECYCLE, ?event, "lifecycle event");
        self.observers.emit(event);
        Ok(())
    }

    /// Subscribe to events.
    ///
    /// The current event, if any, is delivered to `observer` before this
    /// returns.
    pub fn subscribe<F>(&self, observer: F) -> ConnectionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let observer = Arc::new(observer);
        if let Some(current) = self.current() {
            observer(&current);
        }
        self.observers.connect(move |event| observer(event))
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.observers.disconnect(id)
    }

    /// A future resolving once the signal is inside its active window.
    ///
    /// Resolves at once if it already is. A signal that only becomes
    /// observable past its closing event resolves to
    /// [`LifecycleError::AlreadyEnded`], and a dropped one to
    /// [`LifecycleError::Closed`].
    pub fn await_opening_event(&self) -> impl Future<Output = Result<E, LifecycleError>> + Send + use<E> {
        let mut receiver = self.state.subscribe();
        async move {
            let reached = receiver
                .wait_for(|event| matches!(event, Some(e) if *e >= E::OPENING))
                .await
                .map(|event| *event);
            match reached {
                Ok(Some(event)) if event < E::CLOSING => Ok(event),
                Ok(Some(_)) => Err(LifecycleError::AlreadyEnded),
                Ok(None) | Err(_) => Err(LifecycleError::Closed),
            }
        }
    }

    /// A future resolving once the signal reaches its closing event.
    ///
    /// # Errors
    ///
    /// Fails immediately with [`LifecycleError::NotStarted`] before the
    /// opening event and with [`LifecycleError::AlreadyEnded`] at or past the
    /// closing event. The returned future resolves to
    /// [`LifecycleError::Closed`] if the signal is dropped first.
    pub fn await_closing_event(
        &self,
    ) -> Result<impl Future<Output = Result<E, LifecycleError>> + Send + use<E>, LifecycleError> {
        self.ensure_alive()?;
        let mut receiver = self.state.subscribe();
        Ok(async move {
            let reached = receiver
                .wait_for(|event| matches!(event, Some(e) if *e >= E::CLOSING))
                .await
                .map(|event| *event);
            match reached {
                Ok(Some(event)) => Ok(event),
                Ok(None) | Err(_) => Err(LifecycleError::Closed),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_not_started() {
        let signal = LifecycleSignal::<InteractorEvent>::new();
        assert_eq!(signal.current(), None);
        assert_eq!(signal.ensure_alive(), Err(LifecycleError::NotStarted));
        assert!(!signal.is_active());
        assert!(!signal.has_ended());
    }

    #[test]
    fn test_emit_moves_forward_only() {
        let signal = LifecycleSignal::<InteractorEvent>::new();
        signal.emit(InteractorEvent::Active).unwrap();
        assert_eq!(signal.current(), Some(InteractorEvent::Active));

        let err = signal.emit(InteractorEvent::Active).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::OutOfOrder {
                current: "Active".into(),
                attempted: "Active".into()
            }
        );

        signal.emit(InteractorEvent::Inactive).unwrap();
        assert!(signal.emit(InteractorEvent::Active).is_err());
        assert_eq!(signal.current(), Some(InteractorEvent::Inactive));
    }

    #[test]
    fn test_late_subscriber_sees_only_last_event() {
        let signal = LifecycleSignal::<PresenterEvent>::new();
        signal.emit(PresenterEvent::Loaded).unwrap();
        signal.emit(PresenterEvent::Unloaded).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        signal.subscribe(move |event| seen_clone.lock().push(*event));

        assert_eq!(*seen.lock(), vec![PresenterEvent::Unloaded]);
    }

    #[test]
    fn test_subscriber_sees_events_in_order() {
        let signal = LifecycleSignal::<InteractorEvent>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let id = signal.subscribe(move |event| seen_clone.lock().push(*event));

        signal.emit(InteractorEvent::Active).unwrap();
        signal.emit(InteractorEvent::Inactive).unwrap();

        assert_eq!(*seen.lock(), vec![InteractorEvent::Active, InteractorEvent::Inactive]);
        assert!(signal.unsubscribe(id));
    }

    #[test]
    fn test_corresponding_event() {
        assert_eq!(InteractorEvent::Active.corresponding(), Ok(InteractorEvent::Inactive));
        assert_eq!(
            InteractorEvent::Inactive.corresponding(),
            Err(LifecycleError::AlreadyEnded)
        );
        assert_eq!(PresenterEvent::Loaded.corresponding(), Ok(PresenterEvent::Unloaded));
    }

    #[test]
    fn test_await_closing_event_fails_outside_window() {
        let signal = LifecycleSignal::<InteractorEvent>::new();
        assert_eq!(signal.await_closing_event().err(), Some(LifecycleError::NotStarted));

        signal.emit(InteractorEvent::Active).unwrap();
        signal.emit(InteractorEvent::Inactive).unwrap();
        assert_eq!(signal.await_closing_event().err(), Some(LifecycleError::AlreadyEnded));
    }

    #[tokio::test]
    async fn test_await_closing_event_resolves_on_close() {
        let signal = Arc::new(LifecycleSignal::<InteractorEvent>::new());
        signal.emit(InteractorEvent::Active).unwrap();

        let closing = signal.await_closing_event().unwrap();
        let emitter = signal.clone();
        tokio::spawn(async move {
            emitter.emit(InteractorEvent::Inactive).unwrap();
        });

        assert_eq!(closing.await, Ok(InteractorEvent::Inactive));
    }

    #[tokio::test]
    async fn test_await_opening_event() {
        let signal = Arc::new(LifecycleSignal::<InteractorEvent>::new());
        let opening = signal.await_opening_event();
        let emitter = signal.clone();
        tokio::spawn(async move {
            emitter.emit(InteractorEvent::Active).unwrap();
        });
        assert_eq!(opening.await, Ok(InteractorEvent::Active));

        assert_eq!(signal.await_opening_event().await, Ok(InteractorEvent::Active));

        signal.emit(InteractorEvent::Inactive).unwrap();
        assert_eq!(signal.await_opening_event().await, Err(LifecycleError::AlreadyEnded));

        let unstarted = LifecycleSignal::<PresenterEvent>::new();
        let opening = unstarted.await_opening_event();
        drop(unstarted);
        assert_eq!(opening.await, Err(LifecycleError::Closed));
    }

    #[tokio::test]
    async fn test_await_closing_event_reports_dropped_signal() {
        let signal = LifecycleSignal::<InteractorEvent>::new();
        signal.emit(InteractorEvent::Active).unwrap();
        let closing = signal.await_closing_event().unwrap();
        drop(signal);

        assert_eq!(closing.await, Err(LifecycleError::Closed));
    }
}
