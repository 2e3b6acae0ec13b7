//! Logging macro shims.
//!
//! With the `tracing` feature enabled, these re-export the `tracing` macros.
//! Without it, the no-op fallbacks below compile to nothing, so call sites
//! stay unconditional:
//!
//! ```ignore
//! #[cfg(feature = "tracing")]
//! use crate::logging::trace;
//! #[cfg(not(feature = "tracing"))]
//! use crate::trace;
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {};
}
