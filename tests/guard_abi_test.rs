use static_guard::abi::{__cxa_guard_abort, __cxa_guard_acquire, __cxa_guard_release};
use static_guard::{GuardState, GuardWord, StaticGuard};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Plain, non-atomic storage published only through the guard.
struct Unsynced(UnsafeCell<u32>);

// Safety: writes happen before `__cxa_guard_release`, reads after an acquire
// that returned 0, so the global guard lock orders them.
unsafe impl Sync for Unsynced {}

#[test]
fn value_written_before_release_is_visible() {
    let guard = Arc::new(StaticGuard::new());
    let value = Arc::new(Unsynced(UnsafeCell::new(0)));

    let writer = {
        let (guard, value) = (guard.clone(), value.clone());
        thread::spawn(move || unsafe {
            assert_eq!(__cxa_guard_acquire(guard.as_ptr()), 1);
            *value.0.get() = 42;
            __cxa_guard_release(guard.as_ptr());
        })
    };
    writer.join().unwrap();

    let word = unsafe { *guard.as_ptr() };
    assert!(word.is_initialized());
    assert_eq!(guard.state(), GuardState::Initialized);

    let reader = thread::spawn(move || unsafe {
        assert_eq!(__cxa_guard_acquire(guard.as_ptr()), 0);
        *value.0.get()
    });
    assert_eq!(reader.join().unwrap(), 42);
}

#[test]
fn blocked_acquirer_sees_initializer_writes() {
    let guard = StaticGuard::new();
    let value = Unsynced(UnsafeCell::new(0));
    let barrier = Barrier::new(2);
    let (guard, value, barrier) = (&guard, &value, &barrier);

    thread::scope(|s| {
        s.spawn(move || unsafe {
            assert_eq!(__cxa_guard_acquire(guard.as_ptr()), 1);
            barrier.wait();
            thread::sleep(Duration::from_millis(40));
            *value.0.get() = 7;
            __cxa_guard_release(guard.as_ptr());
        });

        s.spawn(move || unsafe {
            barrier.wait();
            assert_eq!(__cxa_guard_acquire(guard.as_ptr()), 0);
            assert_eq!(*value.0.get(), 7);
        });
    });
}

#[test]
fn contended_acquire_returns_zero_after_release() {
    let guard = StaticGuard::new();
    let released = AtomicBool::new(false);
    let barrier = Barrier::new(2);
    let (guard, released, barrier) = (&guard, &released, &barrier);

    thread::scope(|s| {
        s.spawn(move || unsafe {
            assert_eq!(__cxa_guard_acquire(guard.as_ptr()), 1);
            barrier.wait();
            thread::sleep(Duration::from_millis(50));
            released.store(true, Ordering::SeqCst);
            __cxa_guard_release(guard.as_ptr());
        });

        let waiter = s.spawn(move || {
            barrier.wait();
            let granted = unsafe { __cxa_guard_acquire(guard.as_ptr()) };
            (granted, released.load(Ordering::SeqCst))
        });
        assert_eq!(waiter.join().unwrap(), (0, true));
    });
}

#[test]
fn abort_then_other_thread_is_granted() {
    let guard = StaticGuard::new();
    unsafe {
        assert_eq!(__cxa_guard_acquire(guard.as_ptr()), 1);
        __cxa_guard_abort(guard.as_ptr());
        assert!((*guard.as_ptr()).is_zero());
    }

    let guard = &guard;
    thread::scope(|s| {
        let granted = s
            .spawn(move || unsafe {
                let granted = __cxa_guard_acquire(guard.as_ptr());
                __cxa_guard_release(guard.as_ptr());
                granted
            })
            .join()
            .unwrap();
        assert_eq!(granted, 1);
    });
    assert!(guard.is_initialized());
}

#[test]
fn racing_initializers_run_once() {
    const THREADS: usize = 32;

    let guard = StaticGuard::new();
    let runs = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);
    let (guard, runs, barrier) = (&guard, &runs, &barrier);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(move || {
                barrier.wait();
                guard.call_once(|| {
                    thread::sleep(Duration::from_millis(5));
                    runs.fetch_add(1, Ordering::SeqCst);
                });
                assert!(guard.is_initialized());
            });
        }
    });

    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_initializer_hands_over_to_next_caller() {
    let guard = StaticGuard::new();
    let attempts = AtomicUsize::new(0);
    let (guard, attempts) = (&guard, &attempts);

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(move || {
                // The first attempt fails, every later one succeeds.
                let _ = guard.initialize(|| {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(())
                    } else {
                        Ok(())
                    }
                });
            });
        }
    });

    assert!(guard.is_initialized());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
