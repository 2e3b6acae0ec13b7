#![forbid(unsafe_code)]

//! Error types shared across the statewire crates.
//!
//! Everything here is a programmer error: a miswired provider/consumer pair
//! or a lifecycle call out of order. These are surfaced synchronously at the
//! call site and never retried.

use thiserror::Error;

use crate::scope::ScopeId;

pub type BindResult<T> = std::result::Result<T, BindError>;

#[derive(Debug, Error)]
pub enum BindError {
    /// No provider has published a store under the requested scope.
    #[error(
        "no store provider registered for scope `{scope}`; construct a Provider (or Provider::with_scope) before wrapping consumers"
    )]
    MissingScope { scope: ScopeId },

    /// The scope exists but holds a store of a different type than the
    /// consumer requires.
    #[error(
        "scope `{scope}` holds a store of a different type (consumer expects {expected}); check the consumer's store type or its scope id"
    )]
    ScopeTypeMismatch {
        scope: ScopeId,
        expected: &'static str,
    },

    /// `mount` was called on something that is already mounted.
    #[error("{what} is already mounted; unmount it before mounting again")]
    AlreadyMounted { what: &'static str },
}

impl BindError {
    #[must_use]
    pub fn missing_scope(scope: ScopeId) -> Self {
        Self::MissingScope { scope }
    }

    #[must_use]
    pub fn type_mismatch(scope: ScopeId, expected: &'static str) -> Self {
        Self::ScopeTypeMismatch { scope, expected }
    }

    #[must_use]
    pub fn already_mounted(what: &'static str) -> Self {
        Self::AlreadyMounted { what }
    }
}
