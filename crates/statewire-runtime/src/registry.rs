//! Thread-local scope registry.
//!
//! Providers publish their scope cell here at construction and withdraw it
//! at unmount; consumers resolve a cell by [`ScopeId`] and store type when
//! they are wrapped. Each scope id holds a stack so nested providers shadow
//! outer ones: the most recent registration wins.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use statewire_core::{BindError, BindResult, ScopeId};

struct Entry {
    token: u64,
    cell: Rc<dyn Any>,
}

thread_local! {
    static REGISTRY: RefCell<AHashMap<ScopeId, Vec<Entry>>> =
        RefCell::new(AHashMap::new());
}

/// Push a provider's scope cell onto the scope's stack.
pub(crate) fn publish(scope: ScopeId, token: u64, cell: Rc<dyn Any>) {
    REGISTRY.with(|r| {
        r.borrow_mut()
            .entry(scope)
            .or_default()
            .push(Entry { token, cell });
    });
    tracing::debug!(scope = %scope, provider = token, "registry.publish");
}

/// Remove a provider's registration, wherever it sits in the stack.
///
/// Providers do not have to unmount in LIFO order, so this removes by token
/// rather than popping.
pub(crate) fn withdraw(scope: ScopeId, token: u64) {
    REGISTRY.with(|r| {
        let mut reg = r.borrow_mut();
        if let Some(stack) = reg.get_mut(&scope) {
            stack.retain(|entry| entry.token != token);
            if stack.is_empty() {
                reg.remove(&scope);
            }
        }
    });
    tracing::debug!(scope = %scope, provider = token, "registry.withdraw");
}

/// Resolve the innermost cell registered under `scope`, downcast to `C`.
///
/// `expected` is the consumer-facing name of the store type, used in the
/// mismatch error.
pub(crate) fn resolve<C: Any>(scope: ScopeId, expected: &'static str) -> BindResult<Rc<C>> {
    REGISTRY.with(|r| {
        let reg = r.borrow();
        let Some(entry) = reg.get(&scope).and_then(|stack| stack.last()) else {
            return Err(BindError::missing_scope(scope));
        };
        Rc::clone(&entry.cell)
            .downcast::<C>()
            .map_err(|_| BindError::type_mismatch(scope, expected))
    })
}

/// Number of providers currently registered under `scope`.
#[cfg(test)]
pub(crate) fn depth(scope: ScopeId) -> usize {
    REGISTRY.with(|r| r.borrow().get(&scope).map_or(0, Vec::len))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
