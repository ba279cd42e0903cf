//! The process-wide lock shared by every guard word.
//!
//! One mutex and one condition variable cover all guards. Waiters are woken in
//! bulk and re-check their own word, so no per-guard table is needed. The pair
//! is constant-initialized and never torn down.
//!
//! The primitives come from the platform:
//! - unix: `pthread_mutex_t` / `pthread_cond_t` through `libc`
//! - Windows: `SRWLOCK` / `CONDITION_VARIABLE` through `windows-sys`
//! - elsewhere: `std::sync::{Mutex, Condvar}`

use core::fmt;
use core::marker::PhantomData;
use crossbeam_utils::CachePadded;

#[cfg(unix)]
mod pthread;
#[cfg(unix)]
use pthread as sys;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use self::windows as sys;

#[cfg(not(any(unix, windows)))]
mod fallback;
#[cfg(not(any(unix, windows)))]
use fallback as sys;

static GUARD_LOCK: GuardLock = GuardLock::new();

/// A platform synchronization call that reported failure.
///
/// Reported through [`Fatal::cause`](crate::Fatal::cause). The lock itself is
/// internal to the crate:
///
/// ```compile_fail
/// let _ = static_guard::sync::GuardLock::global();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncError {
    call: &'static str,
    code: Option<i32>,
}

impl SyncError {
    pub(crate) const fn new(call: &'static str, code: Option<i32>) -> Self {
        Self { call, code }
    }

    /// Name of the failing platform call.
    pub const fn call(&self) -> &'static str {
        self.call
    }

    /// Error code reported by the platform, if it provides one.
    pub const fn code(&self) -> Option<i32> {
        self.code
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} failed with error code {code}", self.call),
            None => write!(f, "{} failed", self.call),
        }
    }
}

impl std::error::Error for SyncError {}

/// Mutex + condition variable pair guarding every guard word.
pub struct GuardLock {
    raw: CachePadded<sys::RawLock>,
}

impl GuardLock {
    const fn new() -> Self {
        Self {
            raw: CachePadded::new(sys::RawLock::new()),
        }
    }

    /// The single process-wide instance.
    #[inline]
    pub fn global() -> &'static GuardLock {
        &GUARD_LOCK
    }

    /// Blocks until the mutex is held.
    ///
    /// # Errors
    /// The platform lock call failed.
    #[inline]
    pub fn lock(&self) -> Result<LockHeld<'_>, SyncError> {
        self.raw.lock().map(LockHeld::new)
    }

    /// Wakes every thread blocked in [`LockHeld::wait`].
    ///
    /// # Errors
    /// The platform wake call failed.
    #[inline]
    pub fn broadcast(&self) -> Result<(), SyncError> {
        self.raw.broadcast()
    }
}

/// Proof that the calling thread holds the global mutex.
///
/// Dropping it releases the mutex without reporting failure; use
/// [`LockHeld::unlock`] when failure has to be observed.
///
/// Not `Send`: the mutex must be released by the thread that locked it.
pub struct LockHeld<'a> {
    inner: sys::Held<'a>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> LockHeld<'a> {
    #[inline]
    fn new(inner: sys::Held<'a>) -> Self {
        Self {
            inner,
            _not_send: PhantomData,
        }
    }
}

impl<'a> LockHeld<'a> {
    /// Releases the mutex, sleeps until the next broadcast (or a spurious
    /// wakeup) and re-acquires it.
    ///
    /// # Errors
    /// The platform wait call failed; the mutex state is then unknown.
    #[inline]
    pub fn wait(self) -> Result<LockHeld<'a>, SyncError> {
        self.inner.wait().map(LockHeld::new)
    }

    /// Releases the mutex.
    ///
    /// # Errors
    /// The platform unlock call failed.
    #[inline]
    pub fn unlock(self) -> Result<(), SyncError> {
        self.inner.unlock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn lock_and_unlock() {
        let lock = GuardLock::global();
        lock.lock().unwrap().unlock().unwrap();
        // Dropping also releases.
        drop(lock.lock().unwrap());
        lock.lock().unwrap().unlock().unwrap();
    }

    #[test]
    fn broadcast_wakes_waiter() {
        let lock = GuardLock::global();
        let ready = AtomicBool::new(false);
        let ready = &ready;

        thread::scope(|s| {
            s.spawn(move || {
                let mut held = lock.lock().unwrap();
                while !ready.load(Ordering::SeqCst) {
                    held = held.wait().unwrap();
                }
                held.unlock().unwrap();
            });

            thread::sleep(Duration::from_millis(20));
            let held = lock.lock().unwrap();
            ready.store(true, Ordering::SeqCst);
            held.unlock().unwrap();
            lock.broadcast().unwrap();
        });
    }

    #[test]
    fn held_lock_stays_on_its_thread() {
        // Resolves only while `LockHeld` does not implement `Send`: with a
        // `Send` impl both blanket impls apply and the call is ambiguous.
        trait AmbiguousIfSend<A> {
            fn check() {}
        }
        impl<T: ?Sized> AmbiguousIfSend<()> for T {}
        struct IsSend;
        impl<T: ?Sized + Send> AmbiguousIfSend<IsSend> for T {}

        <LockHeld<'static> as AmbiguousIfSend<_>>::check();

        let held = GuardLock::global().lock().unwrap();
        held.unlock().unwrap();
    }

    #[test]
    fn sync_error_display() {
        let err = SyncError::new("pthread_mutex_lock", Some(22));
        assert_eq!(err.to_string(), "pthread_mutex_lock failed with error code 22");
        assert_eq!(SyncError::new("Condvar::wait", None).to_string(), "Condvar::wait failed");
    }
}
