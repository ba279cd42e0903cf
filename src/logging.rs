//! Structured logging shim.
//!
//! With the `tracing` feature the macros are `tracing`'s own; without it they
//! expand to nothing.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{error, trace};

#[cfg(not(feature = "tracing"))]
mod noop {
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {error, trace};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop::{error, trace};
