#![forbid(unsafe_code)]

//! Store-to-view binding runtime for statewire.
//!
//! This crate wires an external [`Store`](statewire_core::Store) to view
//! components so each component redraws exactly when the slice of state it
//! depends on changes:
//!
//! - [`Provider`]: owns the single store subscription, detects real state
//!   changes by snapshot identity, and broadcasts to its consumers.
//! - [`Fanout`]: the provider-owned broadcast set, decoupled from the
//!   store's own listener list.
//! - [`connect`] / [`Connected`]: wraps a [`View`] with a memoized
//!   projection from state and own props to derived props.
//! - [`BatchScope`] / [`batch`]: defers broadcasts so a burst of dispatches
//!   collapses into one redraw pass.
//!
//! # Architecture
//!
//! Everything is single-threaded and cooperative, built on `Rc<RefCell<..>>`
//! shared ownership. Providers publish their store into a thread-local scope
//! registry; consumers resolve it by [`ScopeId`](statewire_core::ScopeId) at
//! construction. Listener callbacks hold `Weak` references so a dropped
//! provider or consumer simply goes inert.
//!
//! # Invariants
//!
//! 1. One broadcast per real state change: snapshots equal by identity are
//!    never re-broadcast.
//! 2. Every listener invoked in a broadcast receives the same snapshot.
//! 3. Inside a batch, state updates apply immediately but broadcasts are
//!    deferred to the outermost scope exit, at most once per provider.
//! 4. A consumer never finishes a notification turn rendering anything older
//!    than the newest state it was notified of.
//! 5. Unmount is synchronous: no callback runs after it returns.

pub mod batch;
pub mod connect;
pub mod fanout;
pub mod provider;
mod registry;
pub mod selector;

pub use batch::{BatchScope, batch};
pub use connect::{Connect, Connected, View, connect};
pub use fanout::Fanout;
pub use provider::{Provider, StoreScope};
pub use selector::DerivedSelector;
pub use statewire_core::{
    BindError, BindResult, MemoryStore, ScopeId, Store, StoreId, Subscription,
};
