// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use cadence_bus::{Source, Subject};
use cadence_throttle::{RateSource, ThrottleConfig, ThrottleController, ThrottleMode};
use cadence_timer::Scheduler;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn rig(mode: ThrottleMode, rate: RateSource) -> (Subject<u64>, Scheduler, ThrottleController<u64>) {
    let raw = Subject::new();
    let scheduler = Scheduler::new();
    let controller = ThrottleController::builder()
        .source(raw.clone())
        .scheduler(scheduler.clone())
        .base_interval_ms(60.0)
        .build()
        .expect("source and scheduler are set");
    controller.set_mode(mode, rate, ThrottleConfig::all());
    (raw, scheduler, controller)
}

fn bench_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("throttle_event");
    let proximity = Rc::new(Cell::new(1.5));
    let reading = proximity.clone();
    let cases = [
        ("none", ThrottleMode::None, RateSource::Default),
        ("fixed", ThrottleMode::Fixed, RateSource::Fixed(100.0)),
        (
            "dynamic",
            ThrottleMode::Dynamic,
            RateSource::proximity_fn(move || reading.get()),
        ),
    ];
    for (name, mode, rate) in cases {
        let (raw, scheduler, controller) = rig(mode, rate);
        let _sub = controller.stream().subscribe(|v: &u64| {
            black_box(v);
        });
        group.bench_function(name, |b| {
            let mut i = 0_u64;
            b.iter(|| {
                i = i.wrapping_add(1);
                // One event per simulated millisecond.
                scheduler.advance(Duration::from_millis(1));
                raw.next(black_box(&i));
            });
        });
    }
    group.finish();
    black_box(proximity.get());
}

fn bench_mode_switch(c: &mut Criterion) {
    let (_raw, _scheduler, controller) = rig(ThrottleMode::None, RateSource::Default);
    let _sub = controller.stream().subscribe(|_: &u64| {});
    c.bench_function("throttle_mode_switch", |b| {
        let mut fixed = false;
        b.iter(|| {
            fixed = !fixed;
            let mode = if fixed { ThrottleMode::Fixed } else { ThrottleMode::None };
            controller.set_mode(mode, RateSource::Default, ThrottleConfig::default());
        });
    });
}

criterion_group!(benches, bench_modes, bench_mode_switch);
criterion_main!(benches);
