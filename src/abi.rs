//! C ABI entry points called by compiler-generated code around the first-time
//! initializer of a function-local static.
//!
//! With the `cxa-abi` feature these are exported under their unmangled names
//! and replace the C++ runtime's own. Without it they are ordinary Rust-callable
//! `extern "C"` functions, so the crate can sit next to a system C++ runtime.
//!
//! Failures never reach the caller: a diagnostic is written to stderr and the
//! process aborts.

use crate::fatal::OrTerminate;
use crate::guard::TargetGuard;
use crate::protocol::GuardProtocol;
use core::ffi::c_int;

/// Returns 1 if the caller must run the initializer, 0 if the static is ready.
///
/// # Safety
/// `guard_object` must point to this static's guard word: aligned, zero before
/// first use and never moved. After a return of 1 the caller must call exactly
/// one of [`__cxa_guard_release`] or [`__cxa_guard_abort`].
#[cfg_attr(feature = "cxa-abi", no_mangle)]
pub unsafe extern "C" fn __cxa_guard_acquire(guard_object: *mut TargetGuard) -> c_int {
    // SAFETY: forwarded from the caller.
    let granted = unsafe { GuardProtocol::TARGET.acquire(guard_object) }.or_terminate();
    c_int::from(granted)
}

/// Marks the static initialized and wakes all waiters.
///
/// # Safety
/// `guard_object` must have been granted to the calling thread by
/// [`__cxa_guard_acquire`].
#[cfg_attr(feature = "cxa-abi", no_mangle)]
pub unsafe extern "C" fn __cxa_guard_release(guard_object: *mut TargetGuard) {
    // SAFETY: forwarded from the caller.
    unsafe { GuardProtocol::TARGET.release(guard_object) }.or_terminate();
}

/// Resets the guard after a failed initializer and wakes all waiters.
///
/// # Safety
/// As for [`__cxa_guard_release`].
#[cfg_attr(feature = "cxa-abi", no_mangle)]
pub unsafe extern "C" fn __cxa_guard_abort(guard_object: *mut TargetGuard) {
    // SAFETY: forwarded from the caller.
    unsafe { GuardProtocol::TARGET.abort(guard_object) }.or_terminate();
}
