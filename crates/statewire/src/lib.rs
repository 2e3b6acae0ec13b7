#![forbid(unsafe_code)]

//! Statewire public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users: the
//! store abstractions from `statewire-core` and, behind the default
//! `runtime` feature, the provider/consumer binding layer from
//! `statewire-runtime`.

pub use statewire_core as core;
#[cfg(feature = "runtime")]
pub use statewire_runtime as runtime;

pub mod prelude {
    pub use statewire_core::{
        BindError, BindResult, MemoryStore, ScopeId, Store, StoreId, Subscription,
    };
    #[cfg(feature = "runtime")]
    pub use statewire_runtime::{
        BatchScope, Connect, Connected, Fanout, Provider, StoreScope, View, batch, connect,
    };
}
