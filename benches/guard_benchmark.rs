use criterion::{black_box, criterion_group, criterion_main, Criterion};
use static_guard::abi::{__cxa_guard_abort, __cxa_guard_acquire, __cxa_guard_release};
use static_guard::{StaticGuard, TargetGuard};
use std::sync::OnceLock;

fn bench_fast_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("initialized_fast_path");

    let guard = StaticGuard::new();
    guard.call_once(|| {});
    group.bench_function("static_guard_call_once", |b| {
        b.iter(|| black_box(guard.call_once(|| {})));
    });

    let lock = OnceLock::new();
    lock.get_or_init(|| ());
    group.bench_function("std_once_lock", |b| {
        b.iter(|| black_box(lock.get_or_init(|| ())));
    });

    group.finish();
}

fn bench_uncontended_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_cycle");

    group.bench_function("acquire_abort", |b| {
        let mut word: TargetGuard = 0;
        b.iter(|| unsafe {
            black_box(__cxa_guard_acquire(&mut word));
            __cxa_guard_abort(&mut word);
        });
    });

    group.bench_function("acquire_release_fresh", |b| {
        b.iter(|| {
            let mut word: TargetGuard = 0;
            unsafe {
                black_box(__cxa_guard_acquire(&mut word));
                __cxa_guard_release(&mut word);
            }
            black_box(word)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fast_path, bench_uncontended_cycle);
criterion_main!(benches);
