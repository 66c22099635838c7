//! History-aware navigation.
//!
//! The backstack is an ordered list of [`BackStackEntry`] values; the last
//! entry is current. Navigation is driven by [`Intent`]s:
//!
//! | Intent            | Current entry     | Stack                         |
//! |-------------------|-------------------|-------------------------------|
//! | `Push(c)`         | view detached     | `[.., cur, c]`                |
//! | `Replace(c)`      | destroyed         | `[.., c]`                     |
//! | `NewRoot(c)`      | all destroyed     | `[c]`                         |
//! | `Pop`             | destroyed         | `[.., prev]`, `prev` revived  |
//! | `ShrinkToBundles` | nodes serialized  | unchanged order and length    |
//! | `TearDown`        | action cleaned up | unchanged                     |
//!
//! `Push` and `Replace` of the current configuration, and `Pop` on a single
//! entry, are no-ops.
//!
//! Each intent goes through two steps. The actor performs the side effects
//! through an [`EntryConnector`] and produces an [`Effect`]; [`reduce`] then
//! applies the effect to the state. The reducer is pure, so a sequence of
//! effects can be replayed against a persisted state.
//!
//! Most code uses the [`BackStackRouter`], which owns a
//! [`BackStackManager`] and wires it to its node.

mod connector;
mod entry;
mod manager;
mod router;

pub use connector::{EntryConnector, LeaveMode, Resolver, RibConnector};
pub use entry::{BackStackEntry, BackStackState, RoutingConfiguration};
pub use manager::{reduce, BackStackManager, Effect, Intent};
pub use router::BackStackRouter;
