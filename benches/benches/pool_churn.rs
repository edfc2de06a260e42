// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use cadence_pool::{IndicatorPool, IndicatorRenderer, PoolConfig};
use cadence_timer::Scheduler;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

/// Renderer whose handles own a heap buffer, so creation has a real cost.
#[derive(Default)]
struct Buffers {
    next: u64,
}

impl IndicatorRenderer for Buffers {
    type Handle = (u64, Vec<u8>);
    type Key = u64;
    type Tag = u8;

    fn create(&mut self, tag: &u8) -> Self::Handle {
        self.next += 1;
        (self.next, vec![*tag; 256])
    }

    fn reset(&mut self, handle: &mut Self::Handle, tag: &u8) {
        handle.1.fill(*tag);
    }

    fn key(&self, handle: &Self::Handle) -> u64 {
        handle.0
    }

    fn destroy(&mut self, handle: Self::Handle) {
        black_box(handle);
    }
}

fn bench_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_burst");
    for &capacity in &[0_usize, 50] {
        group.bench_function(format!("capacity={capacity}"), |b| {
            let scheduler = Scheduler::new();
            let pool = IndicatorPool::new(
                Buffers::default(),
                scheduler.clone(),
                PoolConfig {
                    capacity,
                    ..PoolConfig::default()
                },
            );
            b.iter(|| {
                let keys: Vec<u64> = (0..32_u8).filter_map(|t| pool.acquire(&t)).collect();
                for k in &keys {
                    pool.release(k);
                }
            });
        });
    }
    group.finish();
}

fn bench_idle_eviction(c: &mut Criterion) {
    c.bench_function("pool_idle_eviction", |b| {
        b.iter_batched(
            || {
                let scheduler = Scheduler::new();
                let pool = IndicatorPool::new(
                    Buffers::default(),
                    scheduler.clone(),
                    PoolConfig::default(),
                );
                let keys: Vec<u64> = (0..50_u8).filter_map(|t| pool.acquire(&t)).collect();
                for k in &keys {
                    pool.release(k);
                }
                (scheduler, pool)
            },
            |(scheduler, pool)| {
                scheduler.advance(Duration::from_secs(20));
                black_box(pool.free_len());
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_burst, bench_idle_eviction);
criterion_main!(benches);
