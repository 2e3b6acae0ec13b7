#![forbid(unsafe_code)]

//! Deferred broadcast batching.
//!
//! # Design
//!
//! A [`BatchScope`] is a thread-local RAII guard. While at least one scope
//! is open, providers do not broadcast on store notifications; they queue a
//! flush instead. When the outermost scope exits, queued flushes run once
//! each, in first-request order. A flush re-reads the store at that point,
//! so consumers see only the final state of the batch.
//!
//! # Invariants
//!
//! 1. State updates apply immediately inside a batch; only broadcasts are
//!    deferred.
//! 2. Deferred flushes run when the outermost scope exits, in first-request
//!    order.
//! 3. A given provider token is queued at most once per batch.
//! 4. Nested scopes extend the outermost one; they never flush early.
//! 5. Work queued while the drain itself runs executes immediately (the
//!    batch is already over).

use std::cell::RefCell;
use std::rc::Rc;

struct BatchState {
    depth: u32,
    queue: Vec<(u64, Rc<dyn Fn()>)>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState {
        depth: 0,
        queue: Vec::new(),
    });
}

/// RAII guard deferring provider broadcasts until it drops.
#[must_use = "dropping a BatchScope immediately ends the batch"]
pub struct BatchScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl BatchScope {
    /// Open a batch scope. Nested scopes are allowed.
    pub fn enter() -> Self {
        BATCH.with(|b| b.borrow_mut().depth += 1);
        Self {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let drained = BATCH.with(|b| {
            let mut state = b.borrow_mut();
            state.depth -= 1;
            if state.depth == 0 {
                std::mem::take(&mut state.queue)
            } else {
                Vec::new()
            }
        });
        if !drained.is_empty() {
            tracing::trace!(flushes = drained.len(), "batch.drain");
        }
        for (_token, flush) in drained {
            flush();
        }
    }
}

/// Run `f` inside a batch scope.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BatchScope::enter();
    f()
}

/// Whether a batch scope is currently open on this thread.
#[must_use]
pub fn active() -> bool {
    BATCH.with(|b| b.borrow().depth > 0)
}

/// Queue `flush` to run when the outermost scope exits. Deduplicated by
/// `token`: the first request per batch wins its queue position, later ones
/// are dropped.
pub(crate) fn defer(token: u64, flush: Rc<dyn Fn()>) {
    BATCH.with(|b| {
        let mut state = b.borrow_mut();
        if state.queue.iter().any(|(t, _)| *t == token) {
            return;
        }
        state.queue.push((token, flush));
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
