//! Benchmarks for the track/trigger hot path.

use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reactivity_core::observe::{reactive, Value};
use reactivity_core::reactive::{effect, Ref};
use reactivity_core::scheduler::{run_microtasks, watch_effect, WatchOptions};
use serde_json::json;

// =============================================================================
// Refs
// =============================================================================

fn bench_ref_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("ref_fan_out");

    for subscribers in [1usize, 10, 100] {
        let source = Ref::new(0);
        let sink = Rc::new(Cell::new(0.0));
        let effects: Vec<_> = (0..subscribers)
            .map(|_| {
                let (s, out) = (source.clone(), sink.clone());
                effect(move || out.set(s.get().as_number().unwrap_or(0.0)))
            })
            .collect();

        let mut n = 0i32;
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| {
                n += 1;
                source.set(n);
                black_box(sink.get())
            });
        });

        for e in &effects {
            e.stop();
        }
    }

    group.finish();
}

// =============================================================================
// Observed objects
// =============================================================================

fn bench_object_property_write(c: &mut Criterion) {
    let state = reactive(Value::from_json(json!({ "a": 0, "b": 0 })))
        .into_observed()
        .expect("object is observable");
    let s = state.clone();
    let reader = effect(move || {
        black_box(s.get("a"));
        black_box(s.get("b"));
    });

    let mut n = 0i32;
    c.bench_function("object_property_write", |b| {
        b.iter(|| {
            n += 1;
            state.set("a", n);
        });
    });
    reader.stop();
}

fn bench_array_push(c: &mut Criterion) {
    c.bench_function("array_push_100", |b| {
        b.iter(|| {
            let list = reactive(Value::from_json(json!([])))
                .into_observed()
                .expect("array is observable");
            for i in 0..100 {
                list.push([Value::from(i)]);
            }
            black_box(list.len())
        });
    });
}

// =============================================================================
// Scheduler
// =============================================================================

fn bench_batched_flush(c: &mut Criterion) {
    let source = Ref::new(0);
    let s = source.clone();
    let watcher = watch_effect(
        move || {
            black_box(s.get());
        },
        WatchOptions::default(),
    );

    let mut n = 0i32;
    c.bench_function("batched_flush_10_writes", |b| {
        b.iter(|| {
            for _ in 0..10 {
                n += 1;
                source.set(n);
            }
            run_microtasks()
        });
    });
    watcher.stop();
}

criterion_group!(
    benches,
    bench_ref_fan_out,
    bench_object_property_write,
    bench_array_push,
    bench_batched_flush
);
criterion_main!(benches);
