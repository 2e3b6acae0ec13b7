#![forbid(unsafe_code)]

//! Core: the store contract, subscription guards, scope identifiers, and
//! shared error types for the statewire binding layer.

pub mod error;
pub mod logging;
pub mod scope;
pub mod store;
pub mod subscription;

pub use error::{BindError, BindResult};
pub use scope::ScopeId;
pub use store::{MemoryStore, Store, StoreId};
pub use subscription::Subscription;
