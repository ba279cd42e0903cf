//! Guard word layout: the `initialized` and `lock` sub-fields, their encodings,
//! and the thread identity stored under the ownership encoding.

pub mod encoding;
pub mod thread_token;
pub mod word;

pub use encoding::{Encoding, GuardState, LockState};
pub use thread_token::ThreadToken;
pub use word::{GuardWord, TargetGuard};

/// Guard layout chosen for the current build target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Width of the guard word in bytes.
    pub width: usize,
    /// Encoding of the lock sub-field.
    pub encoding: Encoding,
}

impl Layout {
    /// Layout generated code uses on this target.
    pub const TARGET: Layout = Layout {
        width: core::mem::size_of::<TargetGuard>(),
        encoding: Encoding::TARGET,
    };

    /// Returns `true` if a thread re-acquiring its own guard is diagnosed
    /// instead of blocking forever.
    pub fn detects_deadlock(self) -> bool {
        match self.width {
            4 => self.encoding.detects_deadlock::<u32>(),
            _ => self.encoding.detects_deadlock::<u64>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_layout_is_consistent() {
        let layout = Layout::TARGET;
        assert_eq!(layout.width, core::mem::size_of::<TargetGuard>());
        if cfg!(target_arch = "arm") {
            assert_eq!(layout.width, 4);
            assert!(!layout.detects_deadlock());
        } else {
            assert_eq!(layout.width, 8);
            assert_eq!(layout.detects_deadlock(), !cfg!(feature = "boolean-lock"));
        }
    }
}
