#![forbid(unsafe_code)]

//! The store contract and an in-memory reference store.
//!
//! # Design
//!
//! A [`Store`] is the external source of truth the binding layer attaches
//! to: it hands out its current state as a shared snapshot (`Rc<State>`),
//! accepts actions through `dispatch`, and notifies plain `Fn()` listeners
//! after every dispatch. Snapshot identity (`Rc::ptr_eq`) is the change
//! signal; listeners re-read `state()` and compare identities themselves.
//!
//! [`MemoryStore`] is the reference implementation: a single-threaded
//! reducer store whose reducer returns `Option<State>`. Returning `None`
//! keeps the current snapshot (same `Rc`), which makes redundant
//! notifications observable and lets subscribers prove their idempotence.
//!
//! # Invariants
//!
//! 1. `state()` returns the same `Rc` until a dispatch installs a new state.
//! 2. Listeners are notified after the state cell is updated, in
//!    registration order.
//! 3. Every dispatch notifies every listener registered at dispatch time,
//!    even when the reducer keeps the state.
//! 4. A listener removed during a notification pass is not invoked later in
//!    that pass; a listener added during a pass is not invoked in it.
//! 5. `StoreId`s are unique per process.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::subscription::Subscription;

// Import tracing macros (no-op when tracing feature is disabled).
#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

// ─── Store ID generation ─────────────────────────────────────────────────────

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique store identity.
///
/// Providers and selectors compare `StoreId`s to detect wholesale store
/// replacement, so two stores must never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id, for logging.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}", self.0)
    }
}

// ─── Store contract ──────────────────────────────────────────────────────────

/// Contract every bindable store satisfies.
///
/// Implementations are single-threaded handles; `Clone` on the concrete
/// type is expected to produce another handle to the same store, never a
/// second store.
pub trait Store {
    /// The state the store holds. Shared by snapshot, compared by identity.
    type State: 'static;
    /// The action type `dispatch` accepts.
    type Action;

    /// This store's process-unique identity.
    fn id(&self) -> StoreId;

    /// The current state snapshot.
    fn state(&self) -> Rc<Self::State>;

    /// Apply an action and notify listeners.
    fn dispatch(&self, action: Self::Action);

    /// Register a change listener. The listener receives no payload; it
    /// re-reads `state()` and decides by snapshot identity.
    fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription;
}

// ─── MemoryStore ─────────────────────────────────────────────────────────────

struct StoreInner<S, A> {
    id: StoreId,
    state: RefCell<Rc<S>>,
    reducer: Box<dyn Fn(&S, &A) -> Option<S>>,
    listeners: RefCell<Vec<(u64, Rc<dyn Fn()>)>>,
    next_listener: Cell<u64>,
    /// Set while the reducer runs; dispatching then is a programmer error.
    reducing: Cell<bool>,
}

/// Single-threaded in-memory reducer store.
///
/// Cloning a `MemoryStore` creates a new handle to the **same** store.
///
/// # Panics
///
/// `dispatch` panics if called from inside this store's reducer. Dispatching
/// from a change listener is allowed; the nested dispatch completes (with
/// its own notification pass) before the outer pass resumes.
pub struct MemoryStore<S, A> {
    inner: Rc<StoreInner<S, A>>,
}

impl<S, A> Clone for MemoryStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for MemoryStore<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl<S: 'static, A: 'static> MemoryStore<S, A> {
    /// Create a store with an initial state and a reducer.
    ///
    /// The reducer returns `Some(next)` to install a new snapshot or `None`
    /// to keep the current one. Either way every listener is notified.
    pub fn new(initial: S, reducer: impl Fn(&S, &A) -> Option<S> + 'static) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                id: StoreId::next(),
                state: RefCell::new(Rc::new(initial)),
                reducer: Box::new(reducer),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(1),
                reducing: Cell::new(false),
            }),
        }
    }

    /// This store's identity.
    #[must_use]
    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// The current state snapshot.
    #[must_use]
    pub fn state(&self) -> Rc<S> {
        self.inner.state.borrow().clone()
    }

    /// Number of registered listeners (diagnostic).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Reduce `action` into the state, then notify every listener.
    pub fn dispatch(&self, action: A) {
        assert!(
            !self.inner.reducing.get(),
            "MemoryStore::dispatch called from inside its own reducer"
        );
        let prev = self.inner.state.borrow().clone();
        self.inner.reducing.set(true);
        let next = (self.inner.reducer)(&prev, &action);
        self.inner.reducing.set(false);
        if let Some(next) = next {
            *self.inner.state.borrow_mut() = Rc::new(next);
        }
        trace!(
            store = self.inner.id.as_u64(),
            listeners = self.inner.listeners.borrow().len(),
            "store.dispatch"
        );
        self.notify();
    }

    /// Register a change listener.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let weak: Weak<StoreInner<S, A>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
            }
        })
    }

    fn notify(&self) {
        // Iterate a copy so listeners may subscribe or unsubscribe freely;
        // re-check membership so a listener removed mid-pass is skipped.
        let entries: Vec<(u64, Rc<dyn Fn()>)> = self.inner.listeners.borrow().clone();
        for (id, listener) in entries {
            let still_registered = self
                .inner
                .listeners
                .borrow()
                .iter()
                .any(|(lid, _)| *lid == id);
            if still_registered {
                listener();
            }
        }
    }
}

impl<S: 'static, A: 'static> Store for MemoryStore<S, A> {
    type State = S;
    type Action = A;

    fn id(&self) -> StoreId {
        MemoryStore::id(self)
    }

    fn state(&self) -> Rc<S> {
        MemoryStore::state(self)
    }

    fn dispatch(&self, action: A) {
        MemoryStore::dispatch(self, action);
    }

    fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        MemoryStore::subscribe(self, listener)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
