#![forbid(unsafe_code)]

//! Store-connected views: memoized derived props over a provider scope.
//!
//! [`connect`] describes how a view derives its props from store state plus
//! caller-supplied own props; [`Connect::wrap`] resolves the provider's scope
//! cell from the ambient registry and yields a [`Connected`] handle that owns
//! the view. While mounted, the handle listens on the provider's fan-out,
//! re-derives on every broadcast, and re-renders the view only when the
//! derived props actually change.
//!
//! # Design
//!
//! Broadcast payloads are treated as wake-ups, not as data. On every
//! notification the handle re-reads the scope's current snapshot and derives
//! from that. Nested dispatch makes the fan-out deliver snapshots out of
//! order as the broadcast stack unwinds; deriving from the live snapshot
//! turns every stale delivery into a memo hit instead of a regression to an
//! older state.
//!
//! Renders go through a small pump: the view is taken out of its slot for
//! the duration of `render`, and the newest pending props are painted in a
//! loop afterwards. A dispatch from inside `render` therefore cannot
//! re-enter the view; it parks the new props and the pump picks them up when
//! the current render returns. Intermediate values may be skipped, the
//! newest never is.
//!
//! # Invariants
//!
//! 1. A mounted consumer's derived props settle on the scope's newest
//!    snapshot, even across nested dispatch.
//! 2. Rendered props never regress to an older snapshot's derivation.
//! 3. A pure consumer re-renders only when derived props change under its
//!    equality; an impure one re-renders on every broadcast.
//! 4. Unmounting is idempotent, and a consumer unmounted mid-broadcast is
//!    skipped by the rest of that same pass.
//!
//! # Failure Modes
//!
//! A projection that dispatches re-enters the consumer while it is mutably
//! borrowed and panics. Projections must stay pure; views are free to
//! dispatch from `render`.

use std::any::type_name;
use std::cell::RefCell;
use std::rc::Rc;

use statewire_core::{BindError, BindResult, ScopeId, Store, Subscription};

use crate::provider::StoreScope;
use crate::registry;
use crate::selector::{DerivedSelector, Projection, ProjectionFactory};

// ─── View ────────────────────────────────────────────────────────────────────

/// A render target owned by a [`Connected`] handle.
///
/// Implementations receive freshly derived props and redraw themselves.
/// `render` may dispatch; the handle coalesces the resulting broadcasts and
/// repaints with the newest snapshot once the current render returns.
pub trait View {
    /// The derived props this view consumes.
    type Props;

    /// Redraw from the given props.
    fn render(&mut self, props: &Self::Props);
}

// ─── Connect builder ─────────────────────────────────────────────────────────

/// Build a connected view from a projection over `(state, props, store)`.
///
/// The returned [`Connect`] binds to [`ScopeId::DEFAULT`] and compares both
/// own props and derived props with `PartialEq`; use its builder methods to
/// change either before wrapping a view.
#[must_use]
pub fn connect<St, P, D>(
    project: impl Fn(&St::State, &P, &St) -> D + 'static,
) -> Connect<St, P, D>
where
    St: Store + Clone + 'static,
    P: Clone + PartialEq + 'static,
    D: PartialEq + 'static,
{
    let project = Rc::new(project);
    Connect::from_factory(move |store: &St| {
        let store = store.clone();
        let project = Rc::clone(&project);
        let projection: Projection<St::State, P, D> =
            Box::new(move |state, props| project(state, props, &store));
        projection
    })
}

/// Description of how a view derives its props from a scope's store.
///
/// Created by [`connect`] or [`Connect::from_factory`]; consumed by
/// [`Connect::wrap`].
pub struct Connect<St: Store, P, D> {
    factory: ProjectionFactory<St, P, D>,
    scope: ScopeId,
    pure: bool,
    props_equal: Rc<dyn Fn(&P, &P) -> bool>,
    derived_equal: Rc<dyn Fn(&D, &D) -> bool>,
}

impl<St, P, D> Connect<St, P, D>
where
    St: Store + Clone + 'static,
    P: Clone + PartialEq + 'static,
    D: PartialEq + 'static,
{
    /// Build from a projection factory.
    ///
    /// The factory runs once per store handle: at wrap time and again after
    /// each provider store swap, so the projection may close over the store
    /// (for example to capture bound action dispatchers) without going stale.
    #[must_use]
    pub fn from_factory(factory: impl Fn(&St) -> Projection<St::State, P, D> + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
            scope: ScopeId::DEFAULT,
            pure: true,
            props_equal: Rc::new(|a: &P, b: &P| a == b),
            derived_equal: Rc::new(|a: &D, b: &D| a == b),
        }
    }
}

impl<St, P, D> Connect<St, P, D>
where
    St: Store + Clone + 'static,
    P: Clone + 'static,
    D: 'static,
{
    /// Bind to a non-default provider scope.
    #[must_use]
    pub fn scope(mut self, scope: ScopeId) -> Self {
        self.scope = scope;
        self
    }

    /// Disable the memo walls: re-derive and re-render on every broadcast.
    #[must_use]
    pub fn impure(mut self) -> Self {
        self.pure = false;
        self
    }

    /// Override the own-props equality used by the input memo wall.
    #[must_use]
    pub fn props_equal_with(mut self, eq: impl Fn(&P, &P) -> bool + 'static) -> Self {
        self.props_equal = Rc::new(eq);
        self
    }

    /// Override the derived-props equality used by the output memo wall.
    #[must_use]
    pub fn derived_equal_with(mut self, eq: impl Fn(&D, &D) -> bool + 'static) -> Self {
        self.derived_equal = Rc::new(eq);
        self
    }

    /// Bind `view` to the scope's provider and derive its first props.
    ///
    /// Fails with [`BindError::MissingScope`] when no provider is mounted
    /// under the scope, and with [`BindError::ScopeTypeMismatch`] when the
    /// provider there holds a different store type. The view is not rendered
    /// until [`Connected::mount`].
    pub fn wrap<V>(self, view: V, props: P) -> BindResult<Connected<St, V, P>>
    where
        V: View<Props = D> + 'static,
    {
        let scope_cell =
            registry::resolve::<RefCell<StoreScope<St>>>(self.scope, type_name::<St>())?;
        let (store, state) = {
            let scope = scope_cell.borrow();
            (scope.store(), scope.state())
        };
        let mut selector = DerivedSelector::new(
            self.factory,
            &store,
            self.pure,
            self.props_equal,
            self.derived_equal,
        );
        let derived = selector.select(&store, &state, &props);
        tracing::debug!(scope = %self.scope, store = %store.id(), "connect.wrap");
        Ok(Connected {
            inner: Rc::new(RefCell::new(ConnectedInner {
                scope_cell,
                selector,
                view: Some(view),
                props,
                derived,
                fanout_sub: None,
                mounted: false,
                pending: None,
                renders: 0,
            })),
        })
    }
}

// ─── Connected ───────────────────────────────────────────────────────────────

struct ConnectedInner<St: Store, V: View, P> {
    scope_cell: Rc<RefCell<StoreScope<St>>>,
    selector: DerivedSelector<St, P, V::Props>,
    /// Taken out of the slot while `render` runs; `None` doubles as the
    /// re-entrancy flag for the pump.
    view: Option<V>,
    props: P,
    /// The most recently derived props (rendered or about to be).
    derived: Rc<V::Props>,
    fanout_sub: Option<Subscription>,
    mounted: bool,
    /// Newest props awaiting a render; overwritten, never queued.
    pending: Option<Rc<V::Props>>,
    renders: u64,
}

/// A view bound to a provider scope.
///
/// Not `Clone`: the handle is the single owner of the view and of the
/// fan-out subscription, and dropping it unmounts.
pub struct Connected<St: Store, V: View, P> {
    inner: Rc<RefCell<ConnectedInner<St, V, P>>>,
}

impl<St: Store, V: View, P> Connected<St, V, P> {
    /// Detach from the fan-out and stop rendering.
    ///
    /// Idempotent. The view stays owned and [`mount`](Self::mount) may be
    /// called again later; unmounting from inside a broadcast pass makes the
    /// rest of that pass skip this consumer.
    pub fn unmount(&self) {
        let mut c = self.inner.borrow_mut();
        if !c.mounted {
            return;
        }
        c.fanout_sub = None;
        c.mounted = false;
        c.pending = None;
        tracing::debug!(renders = c.renders, "connected.unmount");
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.borrow().mounted
    }

    /// Number of times the view has rendered (diagnostic).
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.inner.borrow().renders
    }

    /// The most recently derived props.
    #[must_use]
    pub fn derived(&self) -> Rc<V::Props> {
        Rc::clone(&self.inner.borrow().derived)
    }

    /// Run `f` against the wrapped view.
    ///
    /// Returns `None` while the view is out of its slot, which happens only
    /// during its own `render`. The closure must not dispatch.
    pub fn with_view<R>(&self, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.inner.borrow().view.as_ref().map(f)
    }

    /// Run `f` against the wrapped view, mutably. See [`with_view`](Self::with_view).
    pub fn with_view_mut<R>(&self, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.inner.borrow_mut().view.as_mut().map(f)
    }
}

impl<St, V, P> Connected<St, V, P>
where
    St: Store + Clone + 'static,
    V: View + 'static,
    V::Props: 'static,
    P: Clone + 'static,
{
    /// Start listening on the provider's fan-out and paint the first frame.
    ///
    /// Re-derives from the scope's current snapshot first, so changes
    /// dispatched between [`Connect::wrap`] and `mount` are caught up here.
    /// The initial render is unconditional.
    pub fn mount(&self) -> BindResult<()> {
        {
            let c = &mut *self.inner.borrow_mut();
            if c.mounted {
                return Err(BindError::already_mounted("connected view"));
            }
            c.mounted = true;
            let weak = Rc::downgrade(&self.inner);
            c.fanout_sub = Some(c.scope_cell.borrow().subscribe(move |_snapshot| {
                if let Some(inner) = weak.upgrade() {
                    Self::on_broadcast(&inner);
                }
            }));
            let (store, state) = Self::scope_read(&c.scope_cell);
            let next = c.selector.select(&store, &state, &c.props);
            c.pending = Some(next);
            tracing::debug!(renders = c.renders, "connected.mount");
        }
        Self::pump(&self.inner);
        Ok(())
    }

    /// Replace the caller-supplied own props and re-derive eagerly.
    ///
    /// While unmounted this only updates [`derived`](Self::derived); while
    /// mounted it renders under the same change gating as a broadcast.
    pub fn set_props(&self, props: P) {
        {
            let c = &mut *self.inner.borrow_mut();
            c.props = props;
            let (store, state) = Self::scope_read(&c.scope_cell);
            let next = c.selector.select(&store, &state, &c.props);
            if !c.mounted {
                c.derived = next;
                return;
            }
            let changed = !Rc::ptr_eq(&next, &c.derived);
            if changed || !c.selector.is_pure() {
                c.pending = Some(next);
            }
        }
        Self::pump(&self.inner);
    }

    /// A handle to the scope's current store.
    ///
    /// Tracks provider store swaps: after a swap this returns the
    /// replacement.
    #[must_use]
    pub fn store(&self) -> St {
        let c = self.inner.borrow();
        let scope = c.scope_cell.borrow();
        scope.store()
    }

    /// Dispatch through the scope's current store.
    ///
    /// All internal borrows are released before the store runs, so the
    /// broadcast may re-enter this consumer.
    pub fn dispatch(&self, action: St::Action) {
        let store = self.store();
        store.dispatch(action);
    }

    /// The current own props.
    #[must_use]
    pub fn props(&self) -> P {
        self.inner.borrow().props.clone()
    }

    /// Number of projection runs since wrap (diagnostic).
    #[must_use]
    pub fn recompute_count(&self) -> u64 {
        self.inner.borrow().selector.recompute_count()
    }

    fn scope_read(cell: &Rc<RefCell<StoreScope<St>>>) -> (St, Rc<St::State>) {
        let scope = cell.borrow();
        (scope.store(), scope.state())
    }

    fn on_broadcast(inner: &Rc<RefCell<ConnectedInner<St, V, P>>>) {
        {
            let c = &mut *inner.borrow_mut();
            if !c.mounted {
                return;
            }
            // Wake-up semantics: derive from the live snapshot, not from the
            // delivered payload. Stale deliveries from an unwinding broadcast
            // stack memo-hit here and change nothing.
            let (store, state) = Self::scope_read(&c.scope_cell);
            let next = c.selector.select(&store, &state, &c.props);
            let changed = !Rc::ptr_eq(&next, &c.derived);
            if changed || !c.selector.is_pure() {
                c.pending = Some(next);
            }
        }
        Self::pump(inner);
    }

    /// Render pending props until none remain, newest first and only.
    fn pump(inner: &Rc<RefCell<ConnectedInner<St, V, P>>>) {
        loop {
            let (mut view, props) = {
                let mut c = inner.borrow_mut();
                let Some(next) = c.pending.take() else { return };
                let Some(view) = c.view.take() else {
                    // A render is already on the stack; it picks this up on
                    // the way out.
                    c.pending = Some(next);
                    return;
                };
                c.derived = Rc::clone(&next);
                c.renders += 1;
                tracing::trace!(renders = c.renders, "connected.render");
                (view, next)
            };
            view.render(&props);
            inner.borrow_mut().view = Some(view);
        }
    }
}

impl<St: Store, V: View, P> Drop for Connected<St, V, P> {
    fn drop(&mut self) {
        self.unmount();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
