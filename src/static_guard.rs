//! `StaticGuard` — a guard word owned by Rust code.

use crate::fatal::OrTerminate;
use crate::guard::{GuardState, TargetGuard};
use crate::protocol::GuardProtocol;
use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::fmt;
use core::mem;

/// A guard word with the target's layout, driven through the guard protocol.
///
/// It has the same size and alignment as [`TargetGuard`], so a pointer from
/// [`as_ptr`](Self::as_ptr) can be handed to code using the raw
/// [`abi`](crate::abi) entry points.
///
/// The guard does not store the value it protects; it only decides which
/// caller initializes it.
///
/// ```rust
/// use static_guard::StaticGuard;
///
/// static GUARD: StaticGuard = StaticGuard::new();
///
/// assert!(GUARD.call_once(|| println!("first")));
/// assert!(!GUARD.call_once(|| unreachable!()));
/// ```
#[repr(transparent)]
pub struct StaticGuard {
    word: UnsafeCell<TargetGuard>,
}

// Safety: the word is only read or written with the global guard lock held.
unsafe impl Sync for StaticGuard {}

impl StaticGuard {
    /// Creates an uninitialized guard.
    pub const fn new() -> Self {
        Self {
            word: UnsafeCell::new(0),
        }
    }

    /// Raw guard word, for the [`abi`](crate::abi) entry points.
    #[inline]
    pub const fn as_ptr(&self) -> *mut TargetGuard {
        self.word.get()
    }

    /// Runs `init` if no caller has completed it yet.
    ///
    /// Returns `Ok(true)` if `init` ran and succeeded here, `Ok(false)` if the
    /// guard was already initialized (waiting first if another thread was in
    /// the middle of it). If `init` fails, or unwinds, the guard is reset and
    /// a later call runs its own initializer.
    ///
    /// Calling this on the same guard from inside `init` terminates the
    /// process where the target layout can detect it, and blocks forever
    /// otherwise.
    ///
    /// # Errors
    /// The error returned by `init`.
    pub fn initialize<E, F>(&self, init: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<(), E>,
    {
        let protocol = GuardProtocol::TARGET;
        // SAFETY: the word is owned by `self` and only driven through the protocol.
        if !unsafe { protocol.acquire(self.as_ptr()) }.or_terminate() {
            return Ok(false);
        }

        let pending = Pending { guard: self };
        let outcome = init();
        mem::forget(pending);

        // SAFETY: this thread was granted the guard above.
        match outcome {
            Ok(()) => {
                unsafe { protocol.release(self.as_ptr()) }.or_terminate();
                Ok(true)
            }
            Err(err) => {
                unsafe { protocol.abort(self.as_ptr()) }.or_terminate();
                Err(err)
            }
        }
    }

    /// Runs `init` if no caller has completed it yet. See [`initialize`](Self::initialize).
    pub fn call_once<F: FnOnce()>(&self, init: F) -> bool {
        let ran = self.initialize::<Infallible, _>(|| {
            init();
            Ok(())
        });
        match ran {
            Ok(ran) => ran,
            Err(never) => match never {},
        }
    }

    /// Current state of the guard.
    pub fn state(&self) -> GuardState {
        // SAFETY: the word is owned by `self`.
        unsafe { GuardProtocol::TARGET.state(self.as_ptr()) }.or_terminate()
    }

    /// Returns `true` once an initializer has completed.
    pub fn is_initialized(&self) -> bool {
        self.state() == GuardState::Initialized
    }
}

impl Default for StaticGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StaticGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticGuard").field("state", &self.state()).finish()
    }
}

/// Aborts the guard if the initializer unwinds.
struct Pending<'a> {
    guard: &'a StaticGuard,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        // SAFETY: only alive while this thread holds the guard.
        unsafe { GuardProtocol::TARGET.abort(self.guard.as_ptr()) }.or_terminate();
    }
}
