#![forbid(unsafe_code)]

//! The provider-owned broadcast set.
//!
//! # Design
//!
//! A [`Fanout`] is the second tier of change propagation: the provider holds
//! the single store subscription and pushes each new snapshot into its
//! fan-out, which delivers it to every registered consumer listener. Keeping
//! this set out of the store means consumers attach and detach without ever
//! touching the store's own listener list.
//!
//! Cloning a `Fanout` creates a new handle to the **same** set.
//!
//! # Invariants
//!
//! 1. Every listener invoked in one `broadcast` call receives the same
//!    snapshot `Rc`.
//! 2. A listener removed during a broadcast (by any callback) is not invoked
//!    later in that broadcast.
//! 3. A listener added during a broadcast is not invoked in that broadcast.
//! 4. Delivery order is registration order.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use statewire_core::Subscription;

struct FanoutInner<S> {
    entries: RefCell<Vec<(u64, Rc<dyn Fn(&Rc<S>)>)>>,
    next_id: Cell<u64>,
}

/// Broadcast set delivering state snapshots to consumer listeners.
pub struct Fanout<S> {
    inner: Rc<FanoutInner<S>>,
}

impl<S> Clone for Fanout<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Fanout<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fanout")
            .field("listeners", &self.inner.entries.borrow().len())
            .finish()
    }
}

impl<S: 'static> Fanout<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(FanoutInner {
                entries: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    /// Register a snapshot listener.
    pub fn subscribe(&self, listener: impl Fn(&Rc<S>) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .entries
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let weak: Weak<FanoutInner<S>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.entries.borrow_mut().retain(|(eid, _)| *eid != id);
            }
        })
    }

    /// Deliver `snapshot` to every registered listener.
    ///
    /// Listener callbacks run with no internal borrow held, so they may
    /// subscribe, unsubscribe, or broadcast again.
    pub fn broadcast(&self, snapshot: &Rc<S>) {
        let entries: Vec<(u64, Rc<dyn Fn(&Rc<S>)>)> = self.inner.entries.borrow().clone();
        tracing::trace!(listeners = entries.len(), "fanout.broadcast");
        for (id, listener) in entries {
            let still_registered = self
                .inner
                .entries
                .borrow()
                .iter()
                .any(|(eid, _)| *eid == id);
            if still_registered {
                listener(snapshot);
            }
        }
    }

    /// Remove every listener at once (provider unmount).
    pub fn clear(&self) {
        self.inner.entries.borrow_mut().clear();
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }
}

impl<S: 'static> Default for Fanout<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
