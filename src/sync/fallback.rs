//! `std::sync` backed global lock for targets without a dedicated backend.

use super::SyncError;
use std::sync::{Condvar, Mutex, MutexGuard};

pub(super) struct RawLock {
    mutex: Mutex<()>,
    cond: Condvar,
}

impl RawLock {
    pub(super) const fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    pub(super) fn lock(&self) -> Result<Held<'_>, SyncError> {
        let guard = self
            .mutex
            .lock()
            .map_err(|_| SyncError::new("Mutex::lock", None))?;
        Ok(Held { raw: self, guard })
    }

    #[allow(clippy::unnecessary_wraps)]
    pub(super) fn broadcast(&self) -> Result<(), SyncError> {
        self.cond.notify_all();
        Ok(())
    }
}

pub(super) struct Held<'a> {
    raw: &'a RawLock,
    guard: MutexGuard<'a, ()>,
}

impl<'a> Held<'a> {
    pub(super) fn wait(self) -> Result<Held<'a>, SyncError> {
        let raw = self.raw;
        let guard = raw
            .cond
            .wait(self.guard)
            .map_err(|_| SyncError::new("Condvar::wait", None))?;
        Ok(Held { raw, guard })
    }

    #[allow(clippy::unnecessary_wraps)]
    pub(super) fn unlock(self) -> Result<(), SyncError> {
        drop(self.guard);
        Ok(())
    }
}
