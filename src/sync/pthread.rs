//! pthread-backed global lock.

use super::SyncError;
use core::cell::UnsafeCell;
use core::mem;

pub(super) struct RawLock {
    mutex: UnsafeCell<libc::pthread_mutex_t>,
    cond: UnsafeCell<libc::pthread_cond_t>,
}

// Safety: the pthread objects are only ever touched through pthread calls,
// which synchronize internally. They live in a static and never move.
unsafe impl Sync for RawLock {}

#[inline]
fn check(call: &'static str, rc: libc::c_int) -> Result<(), SyncError> {
    if rc == 0 {
        Ok(())
    } else {
        Err(SyncError::new(call, Some(rc)))
    }
}

impl RawLock {
    pub(super) const fn new() -> Self {
        Self {
            mutex: UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER),
            cond: UnsafeCell::new(libc::PTHREAD_COND_INITIALIZER),
        }
    }

    pub(super) fn lock(&self) -> Result<Held<'_>, SyncError> {
        // SAFETY: statically initialized mutex at a fixed address.
        check("pthread_mutex_lock", unsafe { libc::pthread_mutex_lock(self.mutex.get()) })?;
        Ok(Held { raw: self })
    }

    pub(super) fn broadcast(&self) -> Result<(), SyncError> {
        // SAFETY: statically initialized condvar at a fixed address.
        check("pthread_cond_broadcast", unsafe { libc::pthread_cond_broadcast(self.cond.get()) })
    }
}

pub(super) struct Held<'a> {
    raw: &'a RawLock,
}

impl<'a> Held<'a> {
    pub(super) fn wait(self) -> Result<Held<'a>, SyncError> {
        let raw = self.raw;
        // Ownership of the mutex passes through pthread_cond_wait; on failure
        // its state is unknown, so it must not be unlocked again from Drop.
        mem::forget(self);
        // SAFETY: the mutex is held by this thread (witnessed by `self`).
        check("pthread_cond_wait", unsafe {
            libc::pthread_cond_wait(raw.cond.get(), raw.mutex.get())
        })?;
        Ok(Held { raw })
    }

    pub(super) fn unlock(self) -> Result<(), SyncError> {
        let raw = self.raw;
        mem::forget(self);
        // SAFETY: the mutex is held by this thread.
        check("pthread_mutex_unlock", unsafe { libc::pthread_mutex_unlock(raw.mutex.get()) })
    }
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        // SAFETY: the mutex is held by this thread.
        unsafe {
            libc::pthread_mutex_unlock(self.raw.mutex.get());
        }
    }
}
