//! Opaque per-thread identity stored in the lock field under the ownership encoding.

use core::cell::Cell;
use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};

static NEXT_TOKEN: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static CURRENT: Cell<Option<ThreadToken>> = const { Cell::new(None) };
}

/// Identity of a thread, comparable and never zero.
///
/// Zero is reserved for "lock clear", so a token can be written into the owner
/// slot of a guard word without ambiguity.
///
/// On Linux the token is the kernel thread id, unique among live threads.
/// Elsewhere it comes from a process-wide 32-bit counter that wraps after 2^32
/// threads have been created. From then on two live threads can share a token,
/// and a thread waiting on a guard held by its twin is reported as a
/// self-deadlock: the process aborts instead of waiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ThreadToken(NonZeroU32);

impl ThreadToken {
    /// Returns the calling thread's token, assigning one on first use.
    pub fn current() -> Self {
        CURRENT
            .try_with(|slot| {
                if let Some(token) = slot.get() {
                    return token;
                }
                let token = Self::allocate();
                slot.set(Some(token));
                token
            })
            // Thread-local storage is already gone. On Linux this still yields
            // the thread's own id; elsewhere the token is fresh and
            // self-deadlock cannot be recognised for this call.
            .unwrap_or_else(|_| Self::allocate())
    }

    /// Rebuilds a token from its raw owner-slot value. Zero means "no owner".
    #[inline]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Raw value as stored in the owner slot.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    #[cfg(target_os = "linux")]
    fn allocate() -> Self {
        // SAFETY: gettid takes no arguments and always succeeds.
        let tid = unsafe { libc::syscall(libc::SYS_gettid) };
        u32::try_from(tid)
            .ok()
            .and_then(Self::from_raw)
            .unwrap_or_else(Self::next_counter)
    }

    #[cfg(not(target_os = "linux"))]
    fn allocate() -> Self {
        Self::next_counter()
    }

    fn next_counter() -> Self {
        loop {
            // Skips zero after wrapping around.
            if let Some(token) = Self::from_raw(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)) {
                return token;
            }
        }
    }
}
