//! Lock-field encodings and guard state classification.
//!
//! Both strategies share the `initialized` sub-field and differ only in how the
//! `lock` sub-field is laid out:
//!
//! - [`Encoding::Ownership`]: the initializing thread's [`ThreadToken`] lives in
//!   the 32-bit owner slot (bytes `4..8` of a wide word). A thread that finds
//!   its own token there on re-entry has deadlocked.
//! - [`Encoding::Boolean`]: byte 1 is a plain "someone is initializing" flag.
//!
//! A word with no owner slot (the 32-bit ARM word) always uses the flag byte,
//! whichever encoding is requested.

use super::thread_token::ThreadToken;
use super::word::GuardWord;
use zerocopy::{AsBytes, FromBytes};

/// Layout strategy for the `lock` sub-field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// The lock field records which thread is initializing.
    Ownership,
    /// The lock field is a true/false flag.
    Boolean,
}

/// Decoded contents of the `lock` sub-field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockState {
    /// Nobody is initializing.
    Free,
    /// Someone is initializing; identity unknown.
    Held,
    /// The given thread is initializing.
    Owned(ThreadToken),
}

impl LockState {
    /// Returns `true` unless the lock field is clear.
    #[inline]
    pub const fn is_held(self) -> bool {
        !matches!(self, LockState::Free)
    }
}

impl Encoding {
    /// Encoding selected for the current build target.
    #[cfg(any(target_arch = "arm", feature = "boolean-lock"))]
    pub const TARGET: Encoding = Encoding::Boolean;

    /// Encoding selected for the current build target.
    #[cfg(not(any(target_arch = "arm", feature = "boolean-lock")))]
    pub const TARGET: Encoding = Encoding::Ownership;

    /// Returns `true` if re-entrant acquisition can be recognised on words of type `W`.
    #[inline]
    pub fn detects_deadlock<W: GuardWord>(self) -> bool {
        self == Encoding::Ownership && W::OWNER_SLOT.is_some()
    }

    /// Reads the `lock` sub-field of `word`.
    pub fn decode_lock<W: GuardWord>(self, word: W) -> LockState {
        let bytes = word.as_bytes();
        match (self, W::OWNER_SLOT) {
            (Encoding::Ownership, Some(at)) => u32::read_from(&bytes[at..at + 4])
                .and_then(ThreadToken::from_raw)
                .map_or(LockState::Free, LockState::Owned),
            _ if bytes[W::FLAG_BYTE] != 0 => LockState::Held,
            _ => LockState::Free,
        }
    }

    /// Builds a word whose `lock` sub-field is held by `holder`.
    ///
    /// Every other bit, `initialized` included, is clear.
    pub fn encode_lock<W: GuardWord>(self, holder: ThreadToken) -> W {
        let mut word = W::new_zeroed();
        let bytes = word.as_bytes_mut();
        match (self, W::OWNER_SLOT) {
            (Encoding::Ownership, Some(at)) => {
                bytes[at..at + 4].copy_from_slice(holder.get().as_bytes());
            }
            _ => bytes[W::FLAG_BYTE] = 1,
        }
        word
    }
}

/// Where a guard word stands in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuardState {
    /// Both sub-fields clear: the next `acquire` grants.
    Uninitialized,
    /// A thread holds the right to initialize.
    InProgress(LockState),
    /// The constructor completed. Terminal.
    Initialized,
}

impl GuardState {
    /// Classifies `word` under `encoding`.
    pub fn classify<W: GuardWord>(word: W, encoding: Encoding) -> Self {
        if word.is_initialized() {
            return GuardState::Initialized;
        }
        match encoding.decode_lock(word) {
            LockState::Free => GuardState::Uninitialized,
            lock => GuardState::InProgress(lock),
        }
    }
}
