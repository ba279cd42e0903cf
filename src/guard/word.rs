//! Guard word storage and its `initialized` sub-field.

use core::fmt::Debug;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

mod sealed {
    pub trait Sealed {}

    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// A caller-owned guard word, one per function-local static.
///
/// Implemented for the two widths the ABI uses: `u32` on narrow targets and
/// `u64` everywhere else. The word is viewed as its native in-memory bytes, so
/// "lowest-addressed byte" means the same thing on both byte orders.
pub trait GuardWord: AsBytes + FromBytes + FromZeroes + Copy + Eq + Debug + sealed::Sealed {
    /// Byte offset of the 32-bit owner slot, if the word is wide enough to carry one.
    const OWNER_SLOT: Option<usize>;

    /// Byte holding the boolean lock flag.
    const FLAG_BYTE: usize = 1;

    /// Returns `true` once the static's constructor ran to completion.
    fn is_initialized(self) -> bool;

    /// Returns a copy of the word with `initialized` set.
    #[must_use]
    fn with_initialized(self) -> Self;

    /// Returns `true` if every bit of the word is clear.
    #[inline]
    fn is_zero(self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }
}

impl GuardWord for u32 {
    const OWNER_SLOT: Option<usize> = None;

    // ARM EABI: only the least significant bit is defined.
    #[inline]
    fn is_initialized(self) -> bool {
        self & 1 != 0
    }

    #[inline]
    fn with_initialized(self) -> Self {
        self | 1
    }
}

impl GuardWord for u64 {
    const OWNER_SLOT: Option<usize> = Some(4);

    #[inline]
    fn is_initialized(self) -> bool {
        self.as_bytes()[0] != 0
    }

    #[inline]
    fn with_initialized(mut self) -> Self {
        self.as_bytes_mut()[0] = 1;
        self
    }
}

/// Guard word type used by generated code on the current target.
#[cfg(target_arch = "arm")]
pub type TargetGuard = u32;

/// Guard word type used by generated code on the current target.
#[cfg(not(target_arch = "arm"))]
pub type TargetGuard = u64;
