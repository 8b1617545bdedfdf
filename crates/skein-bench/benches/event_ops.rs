//! Criterion benchmarks for event signaling and wake-up.

use criterion::{criterion_group, criterion_main, Criterion};
use skein_bench::spawn_fan_out;
use skein_engine::{EventKind, Runtime, RuntimeConfig};

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_fan_out");
    for waiters in [10usize, 1_000, 10_000] {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let event = spawn_fan_out(&mut rt, waiters);
        group.bench_function(format!("{waiters}_waiters"), |b| {
            b.iter(|| std::hint::black_box(rt.signal(event)));
        });
    }
    group.finish();
}

fn bench_event_churn(c: &mut Criterion) {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    c.bench_function("event_create_cancel", |b| {
        b.iter(|| {
            let e = rt.create_event(EventKind::OneShot);
            std::hint::black_box(rt.cancel_event(e))
        });
    });
}

criterion_group!(benches, bench_fan_out, bench_event_churn);
criterion_main!(benches);
