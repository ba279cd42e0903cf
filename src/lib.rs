//! # `static_guard` - Guard words for function-local statics
//!
//! Runtime support for thread-safe, exactly-once lazy initialization of
//! function-local statics. Generated code brackets the first-time initializer
//! of a static with three calls on a caller-owned guard word:
//!
//! ```text
//! if acquire(&guard) != 0 {
//!     run initializer
//!     if it succeeded: release(&guard)
//!     else:            abort(&guard)
//! }
//! ```
//!
//! ## Architecture
//!
//! 1. **Guard words** ([`guard`]): a 32- or 64-bit integer packing an
//!    `initialized` byte (bit 0 on 32-bit ARM) and a `lock` field. The lock
//!    field has two encodings:
//!    - *ownership*: holds the initializing thread's [`ThreadToken`], so a
//!      thread re-entering its own guard is diagnosed;
//!    - *boolean*: a plain flag, where re-entry simply blocks.
//!
//! 2. **Global lock**: one mutex and one condition variable for the
//!    whole process. Every guard word is read and written under the mutex;
//!    `release` and `abort` wake all waiters, which re-check their own word.
//!
//! 3. **Protocol** ([`protocol`]): the state machine
//!    `UNINITIALIZED -> IN_PROGRESS -> INITIALIZED`, with `abort` returning to
//!    `UNINITIALIZED` so a later caller can retry.
//!
//! 4. **Entry points**: the C ABI functions in [`abi`] and the safe
//!    [`StaticGuard`] wrapper.
//!
//! ## Target layouts
//!
//! | Target | Word | Lock encoding | Self-deadlock |
//! |---|---|---|---|
//! | `target_arch = "arm"` | `u32` | boolean (byte 1) | blocks |
//! | everything else | `u64` | ownership (bytes 4..8) | aborts with diagnostic |
//! | everything else + `boolean-lock` | `u64` | boolean (byte 1) | blocks |
//!
//! ## Failures
//!
//! A failing platform lock call or a detected self-deadlock is a [`Fatal`]:
//! the guard protocol's invariants can no longer be trusted, so the ABI entry
//! points and [`StaticGuard`] write a diagnostic to stderr and abort the
//! process. A failing *initializer* is not an error of this crate; the caller
//! reports it with `abort`.
//!
//! ## Example
//!
//! ```rust
//! use static_guard::StaticGuard;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! static GUARD: StaticGuard = StaticGuard::new();
//! static VALUE: AtomicU32 = AtomicU32::new(0);
//!
//! fn value() -> u32 {
//!     GUARD.call_once(|| VALUE.store(42, Ordering::Relaxed));
//!     VALUE.load(Ordering::Relaxed)
//! }
//!
//! assert_eq!(value(), 42);
//! assert!(GUARD.is_initialized());
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod logging;

pub mod abi;
pub mod fatal;
pub mod guard;
pub mod protocol;
pub mod static_guard;
pub(crate) mod sync;

pub use fatal::{Fatal, FatalKind, Operation, OrTerminate};
pub use guard::{Encoding, GuardState, GuardWord, Layout, LockState, TargetGuard, ThreadToken};
pub use protocol::GuardProtocol;
pub use static_guard::StaticGuard;
pub use sync::SyncError;

// Compile-time assertions for the ABI layout
const _: () = {
    use core::mem;

    // Guard words are 4 bytes on 32-bit ARM and 8 bytes everywhere else.
    assert!(mem::size_of::<TargetGuard>() == if cfg!(target_arch = "arm") { 4 } else { 8 });

    // `StaticGuard` is handed to the C ABI by pointer.
    assert!(mem::size_of::<StaticGuard>() == mem::size_of::<TargetGuard>());
    assert!(mem::align_of::<StaticGuard>() == mem::align_of::<TargetGuard>());
};
