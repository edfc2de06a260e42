// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use cadence_bus::{EventBus, EventRecord, Source, Subscription};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn bus_with(types: u32, per_type: usize) -> (EventBus<u32, u64>, Vec<Subscription>) {
    let bus = EventBus::new();
    let mut subs = Vec::new();
    for t in 0..types {
        for _ in 0..per_type {
            subs.push(bus.on(t).subscribe(|r: &EventRecord<u32, u64>| {
                black_box(r.payload());
            }));
        }
    }
    (bus, subs)
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_fan_out");
    for &per_type in &[1_usize, 8, 64] {
        let (bus, _subs) = bus_with(4, per_type);
        group.throughput(Throughput::Elements(per_type as u64));
        group.bench_function(format!("subscribers={per_type}"), |b| {
            let mut i = 0_u64;
            b.iter(|| {
                i = i.wrapping_add(1);
                bus.dispatch(black_box(1), i);
            });
        });
    }
    group.finish();
}

fn bench_channel_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_channels");
    for &types in &[1_u32, 16, 256] {
        let (bus, _subs) = bus_with(types, 1);
        group.bench_function(format!("types={types}"), |b| {
            b.iter(|| bus.dispatch(black_box(0), 7));
        });
    }
    group.finish();
}

fn bench_subscribe_churn(c: &mut Criterion) {
    let bus: EventBus<u32, u64> = EventBus::new();
    let _keep = bus.on(0).subscribe(|_: &EventRecord<u32, u64>| {});
    c.bench_function("bus_subscribe_unsubscribe", |b| {
        b.iter(|| {
            let sub = bus.on(black_box(0)).subscribe(|_: &EventRecord<u32, u64>| {});
            drop(sub);
        });
    });
}

criterion_group!(benches, bench_fan_out, bench_channel_count, bench_subscribe_churn);
criterion_main!(benches);
