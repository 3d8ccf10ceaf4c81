use std::hint::black_box;
use std::sync::mpsc;

use criterion::{criterion_group, criterion_main, Criterion};
use pinpool::ThreadPool;
use rand::prelude::*;

const TASKS: usize = 1000;

/// Work of uneven size so workers finish out of order.
fn busy(iterations: u64) -> u64 {
    (0..iterations).fold(0u64, |acc, i| acc.wrapping_mul(31).wrapping_add(i))
}

fn workloads() -> Vec<u64> {
    let mut rng = thread_rng();
    (0..TASKS).map(|_| rng.gen_range(100..10_000)).collect()
}

fn submit_drain_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_drain");
    let threads = num_cpus::get();
    let work = workloads();

    group.bench_function("pinpool", |b| {
        let pool = ThreadPool::new(threads).unwrap();
        b.iter(|| {
            for &n in &work {
                pool.spawn(move || {
                    black_box(busy(n));
                })
                .unwrap();
            }
            pool.drain();
        });
    });

    group.bench_function("rayon", |b| {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        b.iter(|| {
            pool.scope(|s| {
                for &n in &work {
                    s.spawn(move |_| {
                        black_box(busy(n));
                    });
                }
            });
        });
    });

    group.finish();
}

fn result_handle_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_handles");
    let threads = num_cpus::get();
    let work = workloads();

    group.bench_function("pinpool", |b| {
        let pool = ThreadPool::new(threads).unwrap();
        b.iter(|| {
            let handles: Vec<_> = work
                .iter()
                .map(|&n| pool.submit(move || busy(n)).unwrap())
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .fold(0u64, u64::wrapping_add)
        });
    });

    group.bench_function("rayon", |b| {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        b.iter(|| {
            let (tx, rx) = mpsc::channel();
            for &n in &work {
                let tx = tx.clone();
                pool.spawn(move || {
                    let _ = tx.send(busy(n));
                });
            }
            drop(tx);
            rx.iter().fold(0u64, u64::wrapping_add)
        });
    });

    group.finish();
}

criterion_group!(benches, submit_drain_bench, result_handle_bench);
criterion_main!(benches);
