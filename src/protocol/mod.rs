//! The guard state machine.
//!
//! ```text
//! UNINITIALIZED --acquire--> IN_PROGRESS --release--> INITIALIZED
//!       ^                         |
//!       +---------abort-----------+
//! ```
//!
//! Every read-modify-write of a guard word happens with the global mutex held,
//! so the word itself needs no atomic access. `release` and `abort` broadcast
//! after unlocking; waiters re-check their own word because the condition
//! variable is shared by all guards.

use crate::fatal::{Fatal, FatalKind, Operation};
use crate::guard::{Encoding, GuardState, GuardWord, LockState, ThreadToken};
use crate::logging;
use crate::sync::{GuardLock, LockHeld};

/// Entry points of the guard protocol for one lock-field encoding.
///
/// All protocols share the process-wide guard lock. A given guard word must
/// only ever be driven through protocols of one encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuardProtocol {
    encoding: Encoding,
}

impl GuardProtocol {
    /// Protocol matching the layout generated code uses on this target.
    pub const TARGET: GuardProtocol = GuardProtocol::new(Encoding::TARGET);

    /// Creates a protocol over the given encoding.
    pub const fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    /// The encoding this protocol reads and writes.
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Tries to obtain the right to run the initializer guarded by `guard`.
    ///
    /// Returns `Ok(true)` when the caller must initialize and then call exactly
    /// one of [`release`](Self::release) or [`abort`](Self::abort). Returns
    /// `Ok(false)` once the guarded static is initialized, blocking first if
    /// another thread is initializing it.
    ///
    /// # Errors
    /// A [`Fatal`] if the global lock fails, or if the calling thread already
    /// holds `guard` under an encoding that can tell. The global mutex is not
    /// held when an error is returned.
    ///
    /// # Safety
    /// `guard` must point to a valid, aligned guard word that started out zero
    /// and is only accessed through this protocol for as long as it is in use.
    pub unsafe fn acquire<W: GuardWord>(&self, guard: *mut W) -> Result<bool, Fatal> {
        let op = Operation::Acquire;
        let mut held = lock(op)?;
        // SAFETY: caller guarantees validity; the mutex serializes access.
        let mut word = unsafe { guard.read() };
        if word.is_initialized() {
            unlock(held, op)?;
            return Ok(false);
        }

        let me = ThreadToken::current();
        loop {
            match self.encoding.decode_lock(word) {
                LockState::Free => {
                    // SAFETY: as above.
                    unsafe { guard.write(self.encoding.encode_lock(me)) };
                    logging::trace!(guard = ?guard, encoding = ?self.encoding, "initialization granted");
                    unlock(held, op)?;
                    return Ok(true);
                }
                LockState::Owned(owner) if owner == me => {
                    drop(held);
                    return Err(Fatal::deadlock(op));
                }
                LockState::Owned(_) | LockState::Held => {
                    logging::trace!(guard = ?guard, "waiting for initializer");
                    held = held
                        .wait()
                        .map_err(|e| Fatal::sync(op, FatalKind::WaitFailed, e))?;
                    // SAFETY: as above.
                    word = unsafe { guard.read() };
                    if word.is_initialized() {
                        unlock(held, op)?;
                        return Ok(false);
                    }
                }
            }
        }
    }

    /// Marks `guard` initialized and wakes every waiter.
    ///
    /// # Errors
    /// A [`Fatal`] if the global lock fails.
    ///
    /// # Safety
    /// `guard` must be valid as for [`acquire`](Self::acquire), and the calling
    /// thread must hold it through a successful `acquire`.
    pub unsafe fn release<W: GuardWord>(&self, guard: *mut W) -> Result<(), Fatal> {
        let op = Operation::Release;
        let held = lock(op)?;
        // The lock bits are cleared and `initialized` set in one store.
        // SAFETY: caller guarantees validity; the mutex serializes access.
        unsafe { guard.write(W::new_zeroed().with_initialized()) };
        logging::trace!(guard = ?guard, "initialization released");
        unlock(held, op)?;
        broadcast(op)
    }

    /// Resets `guard` to zero so a later `acquire` can retry, and wakes every waiter.
    ///
    /// # Errors
    /// A [`Fatal`] if the global lock fails.
    ///
    /// # Safety
    /// As for [`release`](Self::release).
    pub unsafe fn abort<W: GuardWord>(&self, guard: *mut W) -> Result<(), Fatal> {
        let op = Operation::Abort;
        let held = lock(op)?;
        // SAFETY: caller guarantees validity; the mutex serializes access.
        unsafe { guard.write(W::new_zeroed()) };
        logging::trace!(guard = ?guard, "initialization aborted");
        unlock(held, op)?;
        broadcast(op)
    }

    /// Snapshot of `guard`'s state, read under the global lock.
    ///
    /// # Errors
    /// A [`Fatal`] if the global lock fails.
    ///
    /// # Safety
    /// `guard` must be valid as for [`acquire`](Self::acquire).
    pub unsafe fn state<W: GuardWord>(&self, guard: *const W) -> Result<GuardState, Fatal> {
        let op = Operation::Inspect;
        let held = lock(op)?;
        // SAFETY: caller guarantees validity; the mutex serializes access.
        let word = unsafe { guard.read() };
        unlock(held, op)?;
        Ok(GuardState::classify(word, self.encoding))
    }
}

impl Default for GuardProtocol {
    fn default() -> Self {
        Self::TARGET
    }
}

#[inline]
fn lock(op: Operation) -> Result<LockHeld<'static>, Fatal> {
    GuardLock::global()
        .lock()
        .map_err(|e| Fatal::sync(op, FatalKind::LockFailed, e))
}

#[inline]
fn unlock(held: LockHeld<'_>, op: Operation) -> Result<(), Fatal> {
    held.unlock().map_err(|e| Fatal::sync(op, FatalKind::UnlockFailed, e))
}

#[inline]
fn broadcast(op: Operation) -> Result<(), Fatal> {
    GuardLock::global()
        .broadcast()
        .map_err(|e| Fatal::sync(op, FatalKind::BroadcastFailed, e))
}
