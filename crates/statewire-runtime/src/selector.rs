#![forbid(unsafe_code)]

//! Memoized derived-props selection.
//!
//! # Design
//!
//! A [`DerivedSelector`] owns one consumer's projection from
//! `(state, props)` to derived props, plus the memo walls that keep
//! unrelated changes from forcing recomputation or redraws:
//!
//! - **Input wall**: with an unchanged state snapshot (by identity), equal
//!   own props, and the same store, the previous derived `Rc` is returned
//!   without running the projection.
//! - **Output wall**: when the projection runs but produces a value equal to
//!   the previous one, the previous `Rc` is returned, so identity stability
//!   tells the consumer "nothing to redraw".
//!
//! The projection is built by a factory that receives the store handle, so
//! projections may close over `dispatch`. When the store identity changes,
//! the projection is rebuilt and the memo is cleared; nothing bound to the
//! old store survives the swap.
//!
//! # Invariants
//!
//! 1. In pure mode the projection runs at most once per distinct
//!    `(store, state identity, props)` input.
//! 2. `select` never returns a value computed from an older state than the
//!    one passed in.
//! 3. The returned `Rc` is identity-equal to the previous return iff the
//!    derived value did not change (pure mode).
//! 4. In impure mode every `select` runs the projection and returns a fresh
//!    allocation.

use std::rc::Rc;

use statewire_core::{Store, StoreId};

/// A built projection from state and own props to derived props.
pub type Projection<S, P, D> = Box<dyn Fn(&S, &P) -> D>;

/// Factory producing a projection bound to a concrete store handle.
pub type ProjectionFactory<St, P, D> =
    Rc<dyn Fn(&St) -> Projection<<St as Store>::State, P, D>>;

/// One consumer's memoizing selector.
pub struct DerivedSelector<St: Store, P, D> {
    factory: ProjectionFactory<St, P, D>,
    projection: Projection<St::State, P, D>,
    pure: bool,
    props_equal: Rc<dyn Fn(&P, &P) -> bool>,
    derived_equal: Rc<dyn Fn(&D, &D) -> bool>,
    bound_store: StoreId,
    last_state: Option<Rc<St::State>>,
    last_props: Option<P>,
    last_derived: Option<Rc<D>>,
    recomputes: u64,
}

impl<St, P, D> DerivedSelector<St, P, D>
where
    St: Store + Clone + 'static,
    P: Clone + 'static,
    D: 'static,
{
    /// Build a selector around `factory`, immediately bound to `store`.
    pub fn new(
        factory: ProjectionFactory<St, P, D>,
        store: &St,
        pure: bool,
        props_equal: Rc<dyn Fn(&P, &P) -> bool>,
        derived_equal: Rc<dyn Fn(&D, &D) -> bool>,
    ) -> Self {
        let projection = factory(store);
        Self {
            factory,
            projection,
            pure,
            props_equal,
            derived_equal,
            bound_store: store.id(),
            last_state: None,
            last_props: None,
            last_derived: None,
            recomputes: 0,
        }
    }

    /// Derive props for `(state, props)` against `store`.
    ///
    /// The projection must be pure: it must not dispatch or otherwise
    /// re-enter the binding layer.
    pub fn select(&mut self, store: &St, state: &Rc<St::State>, props: &P) -> Rc<D> {
        if store.id() != self.bound_store {
            // The projection may close over the old store's dispatch;
            // rebuild it and forget everything memoized against it.
            self.projection = (self.factory)(store);
            self.bound_store = store.id();
            self.last_state = None;
            self.last_props = None;
            self.last_derived = None;
        }

        if self.pure {
            if let (Some(last_state), Some(last_props), Some(last_derived)) =
                (&self.last_state, &self.last_props, &self.last_derived)
            {
                if Rc::ptr_eq(last_state, state) && (self.props_equal)(last_props, props) {
                    return Rc::clone(last_derived);
                }
            }
        }

        let next = (self.projection)(state, props);
        self.recomputes += 1;

        let out = match &self.last_derived {
            Some(prev) if self.pure && (self.derived_equal)(prev, &next) => Rc::clone(prev),
            _ => Rc::new(next),
        };

        self.last_state = Some(Rc::clone(state));
        self.last_props = Some(props.clone());
        self.last_derived = Some(Rc::clone(&out));
        out
    }

    /// Whether the memo walls are in effect.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.pure
    }

    /// Identity of the store the projection is currently bound to.
    #[must_use]
    pub fn bound_store(&self) -> StoreId {
        self.bound_store
    }

    /// Times the projection has run (diagnostic).
    #[must_use]
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
