//! Slim reader/writer lock + condition variable backed global lock.

use super::SyncError;
use core::cell::UnsafeCell;
use core::mem;
use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::System::Threading::{
    AcquireSRWLockExclusive, ReleaseSRWLockExclusive, SleepConditionVariableSRW,
    WakeAllConditionVariable, CONDITION_VARIABLE, CONDITION_VARIABLE_INIT, INFINITE, SRWLOCK,
    SRWLOCK_INIT,
};

pub(super) struct RawLock {
    lock: UnsafeCell<SRWLOCK>,
    cond: UnsafeCell<CONDITION_VARIABLE>,
}

// Safety: SRW locks and condition variables are shared between threads by design
// and are only accessed through the kernel32 calls below.
unsafe impl Sync for RawLock {}

impl RawLock {
    pub(super) const fn new() -> Self {
        Self {
            lock: UnsafeCell::new(SRWLOCK_INIT),
            cond: UnsafeCell::new(CONDITION_VARIABLE_INIT),
        }
    }

    pub(super) fn lock(&self) -> Result<Held<'_>, SyncError> {
        // SAFETY: statically initialized SRW lock at a fixed address.
        unsafe { AcquireSRWLockExclusive(self.lock.get()) };
        Ok(Held { raw: self })
    }

    #[allow(clippy::unnecessary_wraps)]
    pub(super) fn broadcast(&self) -> Result<(), SyncError> {
        // SAFETY: statically initialized condition variable at a fixed address.
        unsafe { WakeAllConditionVariable(self.cond.get()) };
        Ok(())
    }
}

pub(super) struct Held<'a> {
    raw: &'a RawLock,
}

impl<'a> Held<'a> {
    pub(super) fn wait(self) -> Result<Held<'a>, SyncError> {
        let raw = self.raw;
        // Ownership of the lock passes through SleepConditionVariableSRW; on
        // failure its state is unknown, so it must not be released again from
        // Drop. The caller treats the failure as fatal.
        mem::forget(self);
        // SAFETY: the SRW lock is held exclusively by this thread.
        let ok = unsafe { SleepConditionVariableSRW(raw.cond.get(), raw.lock.get(), INFINITE, 0) };
        if ok == 0 {
            // SAFETY: reads the calling thread's last-error value.
            let code = unsafe { GetLastError() };
            return Err(SyncError::new("SleepConditionVariableSRW", i32::try_from(code).ok()));
        }
        Ok(Held { raw })
    }

    #[allow(clippy::unnecessary_wraps)]
    pub(super) fn unlock(self) -> Result<(), SyncError> {
        drop(self);
        Ok(())
    }
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        // SAFETY: the SRW lock is held exclusively by this thread.
        unsafe { ReleaseSRWLockExclusive(self.raw.lock.get()) };
    }
}
