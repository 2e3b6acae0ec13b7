#![forbid(unsafe_code)]

//! RAII unregister guards for listener registrations.
//!
//! # Design
//!
//! Every `subscribe` in this workspace returns a [`Subscription`] that owns
//! the other side of the registration. Dropping the guard (or calling
//! [`unsubscribe`](Subscription::unsubscribe)) removes the listener exactly
//! once; after that the guard is inert.
//!
//! # Invariants
//!
//! 1. The canceler runs at most once, whether through `unsubscribe` or drop.
//! 2. A guard built with [`Subscription::empty`] never runs anything.
//! 3. Dropping a guard after the registry it points at is gone is a no-op
//!    (cancelers capture weak references for exactly this reason).

use std::fmt;

/// Owns one listener registration. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Build a guard around an unregister closure.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard that unregisters nothing.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Whether the guard still holds a pending unregistration.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Unregister now, consuming the guard.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
