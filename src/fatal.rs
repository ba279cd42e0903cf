//! Unrecoverable guard failures.
//!
//! A [`Fatal`] is never an ordinary error: once the global lock misbehaves or a
//! thread re-enters its own guard, guard-word consistency can no longer be
//! vouched for. Rust callers may inspect one, but the ABI entry points and
//! [`StaticGuard`](crate::StaticGuard) always end in [`Fatal::terminate`].

use crate::logging;
use crate::sync::SyncError;
use core::fmt;
use std::io::Write;

/// Guard operation during which a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Acquiring the right to initialize.
    Acquire,
    /// Reporting successful initialization.
    Release,
    /// Reporting aborted initialization.
    Abort,
    /// Reading a guard's state.
    Inspect,
}

impl Operation {
    /// Name used in diagnostics.
    pub const fn symbol(self) -> &'static str {
        match self {
            Operation::Acquire => "__cxa_guard_acquire",
            Operation::Release => "__cxa_guard_release",
            Operation::Abort => "__cxa_guard_abort",
            Operation::Inspect => "guard state inspection",
        }
    }
}

/// What went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FatalKind {
    /// The global mutex could not be locked.
    LockFailed,
    /// The global mutex could not be unlocked.
    UnlockFailed,
    /// Waiting on the global condition variable failed.
    WaitFailed,
    /// Waking waiters on the global condition variable failed.
    BroadcastFailed,
    /// The calling thread already holds this guard.
    Deadlock,
}

impl FatalKind {
    const fn describe(self) -> &'static str {
        match self {
            FatalKind::LockFailed => "failed to acquire mutex",
            FatalKind::UnlockFailed => "failed to release mutex",
            FatalKind::WaitFailed => "condition variable wait failed",
            FatalKind::BroadcastFailed => "failed to broadcast condition variable",
            FatalKind::Deadlock => "detected deadlock",
        }
    }
}

/// An unrecoverable failure of the guard protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fatal {
    op: Operation,
    kind: FatalKind,
    cause: Option<SyncError>,
}

impl Fatal {
    pub(crate) const fn sync(op: Operation, kind: FatalKind, cause: SyncError) -> Self {
        Self { op, kind, cause: Some(cause) }
    }

    pub(crate) const fn deadlock(op: Operation) -> Self {
        Self { op, kind: FatalKind::Deadlock, cause: None }
    }

    /// Operation that failed.
    pub const fn operation(&self) -> Operation {
        self.op
    }

    /// Kind of failure.
    pub const fn kind(&self) -> FatalKind {
        self.kind
    }

    /// Underlying platform failure, if any.
    pub const fn cause(&self) -> Option<SyncError> {
        self.cause
    }

    /// Writes the diagnostic to stderr and aborts the process.
    #[cold]
    pub fn terminate(self) -> ! {
        logging::error!(operation = self.op.symbol(), kind = ?self.kind, "unrecoverable guard failure");
        let mut stderr = std::io::stderr().lock();
        // Nothing sensible is left to do if stderr is gone.
        let _ = writeln!(stderr, "{self}");
        let _ = stderr.flush();
        std::process::abort()
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.symbol(), self.kind.describe())?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Fatal {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Turns a guard result into its value, terminating the process on [`Fatal`].
pub trait OrTerminate<T> {
    /// Unwraps `Ok`, or reports and aborts.
    fn or_terminate(self) -> T;
}

impl<T> OrTerminate<T> for Result<T, Fatal> {
    #[inline]
    fn or_terminate(self) -> T {
        match self {
            Ok(value) => value,
            Err(fatal) => fatal.terminate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn diagnostics_name_the_operation() {
        assert_eq!(
            Fatal::deadlock(Operation::Acquire).to_string(),
            "__cxa_guard_acquire detected deadlock"
        );

        let cause = SyncError::new("pthread_mutex_lock", Some(22));
        let fatal = Fatal::sync(Operation::Release, FatalKind::LockFailed, cause);
        assert_eq!(
            fatal.to_string(),
            "__cxa_guard_release failed to acquire mutex (pthread_mutex_lock failed with error code 22)"
        );
        assert_eq!(fatal.cause(), Some(cause));
        assert!(fatal.source().is_some());
    }

    #[test]
    fn ok_passes_through() {
        let ok: Result<u8, Fatal> = Ok(3);
        assert_eq!(ok.or_terminate(), 3);
    }
}
