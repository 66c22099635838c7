use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::bundle::{keys, Bundle};
use crate::error::BundleError;
use crate::logging::targets;

use super::connector::{EntryConnector, LeaveMode};
use super::entry::{BackStackEntry, BackStackState, RoutingConfiguration};

/// A navigation command.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent<C> {
    Push(C),
    Replace(C),
    NewRoot(C),
    Pop,
    ShrinkToBundles,
    TearDown,
}

#[derive(Debug)]
enum Action<C> {
    Execute(Intent<C>),
    /// Cold start from a restored, non-empty stack.
    ReattachCurrent,
}

/// Structural outcome of an intent, applied by [`reduce`].
#[derive(Debug, Clone)]
pub enum Effect<C> {
    Replace {
        new: BackStackEntry<C>,
    },
    Push {
        updated_old: BackStackEntry<C>,
        new: BackStackEntry<C>,
    },
    NewRoot {
        new: BackStackEntry<C>,
    },
    Pop {
        revived: BackStackEntry<C>,
    },
    UpdateBackStack(Vec<BackStackEntry<C>>),
}

/// Apply `effect` to `state`.
pub fn reduce<C: RoutingConfiguration>(state: &BackStackState<C>, effect: Effect<C>) -> BackStackState<C> {
    let mut entries = state.clone().into_entries();
    match effect {
        Effect::Replace { new } => {
            entries.pop();
            entries.push(new);
        }
        Effect::Push { updated_old, new } => {
            entries.pop();
            entries.push(updated_old);
            entries.push(new);
        }
        Effect::NewRoot { new } => entries = vec![new],
        Effect::Pop { revived } => {
            entries.truncate(entries.len().saturating_sub(2));
            entries.push(revived);
        }
        Effect::UpdateBackStack(updated) => entries = updated,
    }
    BackStackState::new(entries)
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry<C> {
    configuration: C,
    bundles: Vec<Bundle>,
}

struct Pending<C> {
    queue: VecDeque<Action<C>>,
    running: bool,
}

/// State machine over the navigation stack.
///
/// Intents issued while another intent is being processed (from a node
/// callback, for instance) are queued and processed in issue order once it
/// completes.
///
/// [`Intent::TearDown`] is terminal: every intent issued afterwards is
/// dropped with a warning.
pub struct BackStackManager<C: RoutingConfiguration> {
    initial: C,
    state: Mutex<BackStackState<C>>,
    connector: Arc<dyn EntryConnector<C>>,
    pending: Mutex<Pending<C>>,
    torn_down: AtomicBool,
}

impl<C: RoutingConfiguration> BackStackManager<C> {
    /// A manager whose stack starts as `[initial]`.
    pub fn new(initial: C, connector: Arc<dyn EntryConnector<C>>) -> Self {
        Self::restore(initial, Vec::new(), connector)
    }

    /// A manager resuming `entries`; an empty list starts from `initial`.
    pub fn restore(initial: C, entries: Vec<BackStackEntry<C>>, connector: Arc<dyn EntryConnector<C>>) -> Self {
        let manager = Self::unstarted(initial, entries, connector);
        manager.bootstrap();
        manager
    }

    /// A manager that has not touched the connector yet.
    ///
    /// Call [`bootstrap`](Self::bootstrap) before issuing intents.
    pub fn unstarted(initial: C, entries: Vec<BackStackEntry<C>>, connector: Arc<dyn EntryConnector<C>>) -> Self {
        Self {
            initial,
            state: Mutex::new(BackStackState::new(entries)),
            connector,
            pending: Mutex::new(Pending {
                queue: VecDeque::new(),
                running: false,
            }),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Build the initial entry, or reattach the restored current entry.
    pub fn bootstrap(&self) {
        if self.state.lock().is_empty() {
            self.dispatch(Action::Execute(Intent::NewRoot(self.initial.clone())));
        } else {
            self.dispatch(Action::ReattachCurrent);
        }
    }

    pub fn accept(&self, intent: Intent<C>) {
        self.dispatch(Action::Execute(intent));
    }

    pub fn push(&self, configuration: C) {
        self.accept(Intent::Push(configuration));
    }

    pub fn replace(&self, configuration: C) {
        self.accept(Intent::Replace(configuration));
    }

    pub fn new_root(&self, configuration: C) {
        self.accept(Intent::NewRoot(configuration));
    }

    pub fn pop(&self) {
        self.accept(Intent::Pop);
    }

    pub fn shrink_to_bundles(&self) {
        self.accept(Intent::ShrinkToBundles);
    }

    pub fn tear_down(&self) {
        self.accept(Intent::TearDown);
    }

    pub fn state(&self) -> BackStackState<C> {
        self.state.lock().clone()
    }

    pub fn configurations(&self) -> Vec<C> {
        self.state.lock().configurations()
    }

    pub fn current_configuration(&self) -> Option<C> {
        self.state
            .lock()
            .current()
            .map(|entry| entry.configuration().clone())
    }

    pub fn can_pop(&self) -> bool {
        self.state.lock().can_pop()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    fn dispatch(&self, action: Action<C>) {
        if self.is_torn_down() {
            tracing::warn!(target: targets::BACKSTACK, ?action, "intent after tear down is dropped");
            return;
        }
        {
            let mut pending = self.pending.lock();
            pending.queue.push_back(action);
            if pending.running {
                tracing::trace!(target: targets::BACKSTACK, "intent queued behind running intent");
                return;
            }
            pending.running = true;
        }

        let _reset = ProcessingReset(&self.pending);
        loop {
            let next = self.pending.lock().queue.pop_front();
            let Some(action) = next else { break };
            if self.is_torn_down() {
                tracing::warn!(target: targets::BACKSTACK, ?action, "queued intent after tear down is dropped");
                continue;
            }
            self.process(action);
        }
    }

    #[tracing::instrument(skip_all, target = "ribs_core::backstack", level = "trace")]
    fn process(&self, action: Action<C>) {
        let snapshot = self.state.lock().clone();
        let Some(effect) = self.act(&snapshot, action) else {
            return;
        };
        let mut state = self.state.lock();
        *state = reduce(&state, effect);
        tracing::debug!(
            target: targets::BACKSTACK,
            configurations = ?state.configurations(),
            "backstack updated"
        );
    }

    fn act(&self, state: &BackStackState<C>, action: Action<C>) -> Option<Effect<C>> {
        let intent = match action {
            Action::ReattachCurrent => {
                if let Some(current) = state.current() {
                    tracing::debug!(target: targets::BACKSTACK, configuration = ?current.configuration(), "reattaching restored entry");
                    self.connector.go_to(current);
                }
                return None;
            }
            Action::Execute(intent) => intent,
        };
        tracing::debug!(target: targets::BACKSTACK, ?intent, "accepting intent");

        match intent {
            Intent::Push(configuration) => {
                let Some(current) = state.current() else {
                    return Some(self.switch_to_new_root(state, configuration));
                };
                if *current.configuration() == configuration {
                    tracing::trace!(target: targets::BACKSTACK, "push of current configuration ignored");
                    return None;
                }
                self.connector.leave(current, LeaveMode::DetachView);
                let new = BackStackEntry::new(configuration);
                self.connector.go_to(&new);
                Some(Effect::Push {
                    updated_old: current.clone(),
                    new,
                })
            }
            Intent::Replace(configuration) => {
                let Some(current) = state.current() else {
                    return Some(self.switch_to_new_root(state, configuration));
                };
                if *current.configuration() == configuration {
                    tracing::trace!(target: targets::BACKSTACK, "replace with current configuration ignored");
                    return None;
                }
                self.connector.leave(current, LeaveMode::Destroy);
                let new = BackStackEntry::new(configuration);
                self.connector.go_to(&new);
                Some(Effect::Replace { new })
            }
            Intent::NewRoot(configuration) => Some(self.switch_to_new_root(state, configuration)),
            Intent::Pop => {
                let [.., revived, last] = state.entries() else {
                    tracing::trace!(target: targets::BACKSTACK, "pop on single entry ignored");
                    return None;
                };
                self.connector.leave(last, LeaveMode::Destroy);
                self.connector.go_to(revived);
                Some(Effect::Pop {
                    revived: revived.clone(),
                })
            }
            Intent::ShrinkToBundles => Some(Effect::UpdateBackStack(
                self.connector.shrink_to_bundles(state.entries()),
            )),
            Intent::TearDown => {
                self.torn_down.store(true, Ordering::Release);
                self.connector.tear_down(state.entries());
                None
            }
        }
    }

    /// Destroy every entry, top first, then start over from `configuration`.
    fn switch_to_new_root(&self, state: &BackStackState<C>, configuration: C) -> Effect<C> {
        let mut entries = state.entries().iter().rev();
        if let Some(current) = entries.next() {
            self.connector.leave(current, LeaveMode::Destroy);
        }
        for entry in entries {
            self.connector.destroy(entry);
        }
        let new = BackStackEntry::new(configuration);
        self.connector.go_to(&new);
        Effect::NewRoot { new }
    }
}

impl<C> BackStackManager<C>
where
    C: RoutingConfiguration + Serialize,
{
    /// Persist the stack under [`keys::BACK_STACK_STATE`].
    ///
    /// Live entries are asked for their blobs; nothing is detached.
    pub fn save_state(&self, out: &mut Bundle) -> Result<(), BundleError> {
        let persisted: Vec<PersistedEntry<C>> = self
            .state()
            .entries()
            .iter()
            .map(|entry| PersistedEntry {
                configuration: entry.configuration().clone(),
                bundles: entry.snapshot_bundles(),
            })
            .collect();
        out.put_value(keys::BACK_STACK_STATE, &persisted)
    }
}

impl<C> BackStackManager<C>
where
    C: RoutingConfiguration + DeserializeOwned,
{
    /// Entries persisted by [`save_state`](Self::save_state); empty if absent.
    pub fn restore_entries(saved: &Bundle) -> Result<Vec<BackStackEntry<C>>, BundleError> {
        let persisted: Vec<PersistedEntry<C>> = saved
            .get_value(keys::BACK_STACK_STATE)?
            .unwrap_or_default();
        Ok(persisted
            .into_iter()
            .map(|entry| BackStackEntry::restored(entry.configuration, entry.bundles))
            .collect())
    }
}

/// Clears the running flag when processing ends, including by unwinding.
struct ProcessingReset<'a, C>(&'a Mutex<Pending<C>>);

impl<C> Drop for ProcessingReset<'_, C> {
    fn drop(&mut self) {
        let mut pending = self.0.lock();
        pending.running = false;
        if std::thread::panicking() {
            pending.queue.clear();
        }
    }
}
