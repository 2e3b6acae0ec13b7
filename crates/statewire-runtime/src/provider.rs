#![forbid(unsafe_code)]

//! The root subscriber: one store subscription, fanned out to consumers.
//!
//! # Design
//!
//! A [`Provider`] owns the single subscription to its [`Store`] and turns
//! raw store notifications into snapshot broadcasts. On every notification
//! it re-reads the store state and compares identities with the last
//! snapshot it broadcast; only a real change reaches the [`Fanout`]. While a
//! [`BatchScope`](crate::batch::BatchScope) is open, the broadcast is
//! deferred and deduplicated, so a burst of dispatches costs one flush.
//!
//! At construction the provider publishes a [`StoreScope`] cell into the
//! thread-local scope registry. Consumers resolve that cell to reach the
//! store, subscribe to snapshots, and observe store replacement through its
//! generation counter. Publishing happens at construction rather than mount
//! so consumers can be wired up before the provider starts delivering.
//!
//! # Invariants
//!
//! 1. At most one store subscription exists per provider at any time.
//! 2. `previous` is updated before the broadcast starts, so re-entrant
//!    notifications compare against the snapshot already being delivered.
//! 3. Store notifications arriving while unmounted are dropped.
//! 4. Swapping stores drops the old subscription before anything else; the
//!    old store cannot deliver into the new wiring.
//!
//! # Failure Modes
//!
//! - **Store panics in `state` or `subscribe`**: the panic propagates to the
//!   caller; the provider makes no attempt to retry.
//! - **Consumer panics during a broadcast**: the broadcast stops at that
//!   consumer. State is still consistent (`previous` was already updated),
//!   so the next dispatch delivers the newer snapshot to everyone.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use statewire_core::{BindError, BindResult, ScopeId, Store, StoreId, Subscription};

use crate::batch;
use crate::fanout::Fanout;
use crate::registry;

// ─── Provider token generation ───────────────────────────────────────────────

static NEXT_PROVIDER_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_provider_token() -> u64 {
    NEXT_PROVIDER_TOKEN.fetch_add(1, Ordering::Relaxed)
}

// ─── StoreScope ──────────────────────────────────────────────────────────────

/// The value a provider publishes for its consumers.
///
/// Consumers reach the store handle, the current snapshot, and snapshot
/// subscriptions through this; `generation` increments whenever the
/// provider replaces its store wholesale.
pub struct StoreScope<St: Store> {
    store: St,
    fanout: Fanout<St::State>,
    generation: u64,
}

impl<St: Store + Clone + 'static> StoreScope<St> {
    /// A handle to the scope's current store.
    #[must_use]
    pub fn store(&self) -> St {
        self.store.clone()
    }

    /// Identity of the scope's current store.
    #[must_use]
    pub fn store_id(&self) -> StoreId {
        self.store.id()
    }

    /// The store's current state snapshot.
    #[must_use]
    pub fn state(&self) -> Rc<St::State> {
        self.store.state()
    }

    /// Dispatch an action to the scope's current store.
    pub fn dispatch(&self, action: St::Action) {
        self.store.dispatch(action);
    }

    /// Bumped once per store replacement.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Register a snapshot listener on the provider's fan-out.
    pub fn subscribe(&self, listener: impl Fn(&Rc<St::State>) + 'static) -> Subscription {
        self.fanout.subscribe(listener)
    }
}

// ─── Provider ────────────────────────────────────────────────────────────────

struct ProviderCore<St: Store> {
    token: u64,
    scope_id: ScopeId,
    store: St,
    fanout: Fanout<St::State>,
    /// The last snapshot broadcast (or the construction-time snapshot).
    previous: Rc<St::State>,
    scope_cell: Rc<RefCell<StoreScope<St>>>,
    store_sub: Option<Subscription>,
    mounted: bool,
    registered: bool,
    /// Broadcasts performed (diagnostic).
    flushes: u64,
}

/// Root subscriber binding one store to a scope's consumers.
///
/// Not `Clone`: the provider is the single owner of its registration and
/// store subscription, and dropping it unmounts.
pub struct Provider<St: Store> {
    core: Rc<RefCell<ProviderCore<St>>>,
}

impl<St: Store> Provider<St> {
    /// Stop broadcasting and withdraw from the scope registry.
    ///
    /// Idempotent. Consumers keep their scope cell alive but receive no
    /// further snapshots; the fan-out is cleared. [`mount`](Self::mount) may
    /// be called again afterwards.
    pub fn unmount(&self) {
        let mut core = self.core.borrow_mut();
        if !core.mounted && !core.registered {
            return;
        }
        core.store_sub = None;
        core.fanout.clear();
        if core.registered {
            registry::withdraw(core.scope_id, core.token);
            core.registered = false;
        }
        core.mounted = false;
    }

    /// The scope this provider publishes under.
    #[must_use]
    pub fn scope_id(&self) -> ScopeId {
        self.core.borrow().scope_id
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.core.borrow().mounted
    }

    /// Number of consumer listeners currently registered (diagnostic).
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.core.borrow().fanout.len()
    }

    /// Number of broadcasts performed (diagnostic).
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.core.borrow().flushes
    }
}

impl<St: Store + Clone + 'static> Provider<St> {
    /// Create a provider for `store` under [`ScopeId::DEFAULT`].
    pub fn new(store: St) -> Self {
        Self::with_scope(store, ScopeId::DEFAULT)
    }

    /// Create a provider for `store` under a named scope.
    ///
    /// The scope cell is published immediately; consumers may be constructed
    /// before [`mount`](Self::mount). Broadcasts only start after mount.
    pub fn with_scope(store: St, scope_id: ScopeId) -> Self {
        let token = next_provider_token();
        let fanout = Fanout::new();
        let previous = store.state();
        let scope_cell = Rc::new(RefCell::new(StoreScope {
            store: store.clone(),
            fanout: fanout.clone(),
            generation: 0,
        }));
        registry::publish(scope_id, token, scope_cell.clone());
        tracing::debug!(provider = token, scope = %scope_id, store = %store.id(), "provider.created");
        Self {
            core: Rc::new(RefCell::new(ProviderCore {
                token,
                scope_id,
                store,
                fanout,
                previous,
                scope_cell,
                store_sub: None,
                mounted: false,
                registered: true,
                flushes: 0,
            })),
        }
    }

    /// Subscribe to the store and start broadcasting.
    ///
    /// Performs one catch-up flush: state dispatched between construction
    /// and mount is broadcast here, after the store subscription is in
    /// place, so nothing slips through the gap. Like any other broadcast
    /// it is deferred while a batch scope is open.
    pub fn mount(&self) -> BindResult<()> {
        {
            let mut core = self.core.borrow_mut();
            if core.mounted {
                return Err(BindError::already_mounted("provider"));
            }
            core.mounted = true;
            if !core.registered {
                registry::publish(core.scope_id, core.token, core.scope_cell.clone());
                core.registered = true;
            }
        }
        self.attach_store_listener();
        Self::request_flush(&self.core);
        Ok(())
    }

    /// Replace the provider's store.
    ///
    /// Same-identity stores are a no-op. Otherwise the old subscription is
    /// dropped first, the scope cell is updated (generation bump), and, if
    /// mounted, the provider resubscribes and flushes so consumers converge
    /// on the new store's state without a missed or doubled notification.
    pub fn set_store(&self, store: St) {
        let mounted = {
            let mut core = self.core.borrow_mut();
            if core.store.id() == store.id() {
                return;
            }
            tracing::debug!(
                provider = core.token,
                old = %core.store.id(),
                new = %store.id(),
                "provider.swap_store"
            );
            core.store_sub = None;
            core.store = store.clone();
            {
                let mut cell = core.scope_cell.borrow_mut();
                cell.store = store;
                cell.generation += 1;
            }
            core.mounted
        };
        if mounted {
            self.attach_store_listener();
            Self::request_flush(&self.core);
        }
    }

    /// A handle to the current store.
    #[must_use]
    pub fn store(&self) -> St {
        self.core.borrow().store.clone()
    }

    fn attach_store_listener(&self) {
        let store = self.core.borrow().store.clone();
        let weak = Rc::downgrade(&self.core);
        let sub = store.subscribe(move || {
            if let Some(core) = weak.upgrade() {
                Self::request_flush(&core);
            }
        });
        self.core.borrow_mut().store_sub = Some(sub);
    }

    /// Flush now, or queue a single flush for the end of the open batch.
    fn request_flush(core: &Rc<RefCell<ProviderCore<St>>>) {
        let (token, mounted) = {
            let c = core.borrow();
            (c.token, c.mounted)
        };
        if !mounted {
            return;
        }
        if batch::active() {
            let weak = Rc::downgrade(core);
            batch::defer(
                token,
                Rc::new(move || {
                    if let Some(core) = weak.upgrade() {
                        Self::flush(&core);
                    }
                }),
            );
        } else {
            Self::flush(core);
        }
    }

    /// Broadcast the current snapshot if it differs from the last one.
    ///
    /// The internal borrow is released before listeners run, so consumers
    /// may dispatch, unsubscribe, or unmount from inside their callbacks.
    fn flush(core: &Rc<RefCell<ProviderCore<St>>>) {
        let (snapshot, fanout) = {
            let mut c = core.borrow_mut();
            if !c.mounted {
                return;
            }
            let current = c.store.state();
            if Rc::ptr_eq(&current, &c.previous) {
                return;
            }
            c.previous = Rc::clone(&current);
            c.flushes += 1;
            tracing::trace!(provider = c.token, flushes = c.flushes, "provider.flush");
            (current, c.fanout.clone())
        };
        fanout.broadcast(&snapshot);
    }
}

impl<St: Store> Drop for Provider<St> {
    fn drop(&mut self) {
        self.unmount();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
