//! Property-based invariant tests for the provider/consumer binding layer.
//!
//! These verify, for **any** sequence of dispatches, prop updates, batches,
//! and mount churn:
//!
//! 1. A mounted pure consumer's render log is exactly the change-gated
//!    model's: one render per op that really changes its derived props,
//!    none otherwise.
//! 2. Derived props never lag: after every sequence they equal the
//!    projection of the final state and props.
//! 3. Renders never exceed one per op plus the initial mount paint.
//! 4. Slice consumers are independent: an op that leaves a slice untouched
//!    never renders that slice's consumer.
//! 5. A batch collapses to at most one render regardless of its size.
//! 6. Nothing renders while unmounted, and every remount paints exactly
//!    once.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use statewire_runtime::provider::Provider;
use statewire_runtime::{MemoryStore, ScopeId, View, batch, connect};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Records every rendered value.
struct Probe {
    log: Rc<RefCell<Vec<i64>>>,
}

impl View for Probe {
    type Props = i64;

    fn render(&mut self, props: &i64) {
        self.log.borrow_mut().push(*props);
    }
}

type CounterStore = MemoryStore<i64, i64>;

/// Counter store whose reducer treats a zero delta as "no change".
fn counter_store() -> CounterStore {
    MemoryStore::new(0, |state, delta| {
        if *delta == 0 { None } else { Some(state + delta) }
    })
}

/// The model only expects a render when the derived value really moves.
fn push_if_changed(expected: &mut Vec<i64>, value: i64) {
    if expected.last() != Some(&value) {
        expected.push(value);
    }
}

#[derive(Clone, Debug)]
enum Op {
    Dispatch(i64),
    SetProps(i64),
    Batch(Vec<i64>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-5i64..=5).prop_map(Op::Dispatch),
        (0i64..=3).prop_map(Op::SetProps),
        proptest::collection::vec(-5i64..=5, 1..6).prop_map(Op::Batch),
    ]
}

fn op_sequences() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(op(), 0..40)
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2 + 3. The render log matches the change-gated model exactly
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn render_log_matches_the_change_gated_model(ops in op_sequences()) {
        let scope = ScopeId::named("prop.model");
        let provider = Provider::with_scope(counter_store(), scope);
        provider.mount().unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let connected =
            connect(|state: &i64, offset: &i64, _store: &CounterStore| state + offset)
                .scope(scope)
                .wrap(Probe { log: Rc::clone(&log) }, 0)
                .unwrap();
        connected.mount().unwrap();

        let mut state = 0i64;
        let mut offset = 0i64;
        let mut expected = vec![0i64];

        for op in &ops {
            match op {
                Op::Dispatch(delta) => {
                    provider.store().dispatch(*delta);
                    if *delta != 0 {
                        state += *delta;
                        push_if_changed(&mut expected, state + offset);
                    }
                }
                Op::SetProps(next) => {
                    connected.set_props(*next);
                    offset = *next;
                    push_if_changed(&mut expected, state + offset);
                }
                Op::Batch(deltas) => {
                    batch(|| {
                        for delta in deltas {
                            provider.store().dispatch(*delta);
                        }
                    });
                    if deltas.iter().any(|d| *d != 0) {
                        state += deltas.iter().sum::<i64>();
                        // A batch whose edits cancel out still broadcasts
                        // (the snapshot identity changed) but the derived
                        // value is equal, so no render is expected.
                        push_if_changed(&mut expected, state + offset);
                    }
                }
            }
        }

        prop_assert_eq!(&*log.borrow(), &expected);
        prop_assert_eq!(*connected.derived(), state + offset);
        prop_assert_eq!(connected.render_count(), expected.len() as u64);
        prop_assert!(
            expected.len() <= 1 + ops.len(),
            "{} renders for {} ops",
            expected.len(),
            ops.len()
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Untouched slices never render
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn untouched_slices_never_render(
        edits in proptest::collection::vec((prop::bool::ANY, -3i64..=3), 0..60),
    ) {
        type PairStore = MemoryStore<(i64, i64), (bool, i64)>;
        let scope = ScopeId::named("prop.slices");
        let store: PairStore =
            MemoryStore::new((0, 0), |state: &(i64, i64), edit: &(bool, i64)| {
                let (left, delta) = *edit;
                if delta == 0 {
                    None
                } else if left {
                    Some((state.0 + delta, state.1))
                } else {
                    Some((state.0, state.1 + delta))
                }
            });
        let provider = Provider::with_scope(store, scope);
        provider.mount().unwrap();

        let left_log = Rc::new(RefCell::new(Vec::new()));
        let left = connect(|state: &(i64, i64), _props: &(), _store: &PairStore| state.0)
            .scope(scope)
            .wrap(Probe { log: Rc::clone(&left_log) }, ())
            .unwrap();
        left.mount().unwrap();

        let right_log = Rc::new(RefCell::new(Vec::new()));
        let right = connect(|state: &(i64, i64), _props: &(), _store: &PairStore| state.1)
            .scope(scope)
            .wrap(Probe { log: Rc::clone(&right_log) }, ())
            .unwrap();
        right.mount().unwrap();

        let mut model = (0i64, 0i64);
        let mut expect_left = vec![0i64];
        let mut expect_right = vec![0i64];

        for (is_left, delta) in &edits {
            provider.store().dispatch((*is_left, *delta));
            if *delta != 0 {
                if *is_left {
                    model.0 += *delta;
                    expect_left.push(model.0);
                } else {
                    model.1 += *delta;
                    expect_right.push(model.1);
                }
            }
        }

        prop_assert_eq!(&*left_log.borrow(), &expect_left);
        prop_assert_eq!(&*right_log.borrow(), &expect_right);
        prop_assert_eq!(*left.derived(), model.0);
        prop_assert_eq!(*right.derived(), model.1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. A batch collapses to at most one render
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn a_batch_collapses_to_at_most_one_render(
        deltas in proptest::collection::vec(-5i64..=5, 0..20),
    ) {
        let scope = ScopeId::named("prop.batch");
        let provider = Provider::with_scope(counter_store(), scope);
        provider.mount().unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let connected = connect(|state: &i64, _props: &(), _store: &CounterStore| *state)
            .scope(scope)
            .wrap(Probe { log: Rc::clone(&log) }, ())
            .unwrap();
        connected.mount().unwrap();

        batch(|| {
            for delta in &deltas {
                provider.store().dispatch(*delta);
            }
        });

        let net: i64 = deltas.iter().sum();
        let touched = deltas.iter().any(|d| *d != 0);
        let expected = if touched && net != 0 { vec![0, net] } else { vec![0] };
        prop_assert_eq!(&*log.borrow(), &expected);
        prop_assert_eq!(*connected.derived(), net);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Unmounted consumers stay silent; every remount paints once
// ═════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
enum ChurnOp {
    Dispatch(i64),
    Mount,
    Unmount,
}

fn churn_ops() -> impl Strategy<Value = Vec<ChurnOp>> {
    proptest::collection::vec(
        prop_oneof![
            (-4i64..=4).prop_map(ChurnOp::Dispatch),
            Just(ChurnOp::Mount),
            Just(ChurnOp::Unmount),
        ],
        0..50,
    )
}

proptest! {
    #[test]
    fn unmounted_consumers_stay_silent(ops in churn_ops()) {
        let scope = ScopeId::named("prop.churn");
        let provider = Provider::with_scope(counter_store(), scope);
        provider.mount().unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let connected = connect(|state: &i64, _props: &(), _store: &CounterStore| *state)
            .scope(scope)
            .wrap(Probe { log: Rc::clone(&log) }, ())
            .unwrap();
        connected.mount().unwrap();

        let mut mounted = true;
        let mut state = 0i64;
        let mut expected = vec![0i64];

        for op in &ops {
            match op {
                ChurnOp::Dispatch(delta) => {
                    provider.store().dispatch(*delta);
                    if *delta != 0 {
                        state += *delta;
                        if mounted {
                            push_if_changed(&mut expected, state);
                        }
                    }
                }
                ChurnOp::Mount => {
                    if connected.mount().is_ok() {
                        mounted = true;
                        // The remount paint is unconditional, even when the
                        // state never moved while unmounted.
                        expected.push(state);
                    }
                }
                ChurnOp::Unmount => {
                    connected.unmount();
                    mounted = false;
                }
            }
        }

        prop_assert_eq!(&*log.borrow(), &expected);
        if mounted {
            prop_assert_eq!(*connected.derived(), state);
        }
    }
}
