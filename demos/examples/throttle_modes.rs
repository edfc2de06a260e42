// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Throttle modes.
//!
//! Feeds the same burst of raw events through each mode and prints the
//! virtual time of every emission.
//!
//! Run:
//! - `cargo run -p cadence_demos --example throttle_modes`

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use cadence_bus::{Source, Subject};
use cadence_throttle::{RateSource, ThrottleConfig, ThrottleController, ThrottleMode};
use cadence_timer::Scheduler;
use tracing_subscriber::EnvFilter;

const BURST: [u64; 8] = [0, 10, 20, 150, 160, 300, 310, 600];

fn run(
    label: &str,
    mode: ThrottleMode,
    rate: RateSource,
    config: ThrottleConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw: Subject<u64> = Subject::new();
    let scheduler = Scheduler::new();
    let controller = ThrottleController::builder()
        .source(raw.clone())
        .scheduler(scheduler.clone())
        .base_interval_ms(100.0)
        .build()?;
    controller.set_mode(mode, rate, config);

    let clock = scheduler.clone();
    let _sub = controller.stream().subscribe(move |sent: &u64| {
        println!("  event@{sent:>3}ms emitted@{:>3}ms", clock.now().as_millis());
    });

    println!("== {label} ==");
    for t in BURST {
        scheduler.advance_to(Duration::from_millis(t));
        raw.next(&t);
    }
    scheduler.run_until_idle();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run("none", ThrottleMode::None, RateSource::Default, ThrottleConfig::default())?;
    run(
        "fixed 100ms, leading",
        ThrottleMode::Fixed,
        RateSource::Default,
        ThrottleConfig::LEADING,
    )?;
    run(
        "fixed 100ms, leading + trailing",
        ThrottleMode::Fixed,
        RateSource::Fixed(100.0),
        ThrottleConfig::all(),
    )?;
    run(
        "fixed 100ms, trailing",
        ThrottleMode::Fixed,
        RateSource::Fixed(100.0),
        ThrottleConfig::TRAILING,
    )?;

    // Proximity shrinks as the pretend target approaches.
    let proximity = Rc::new(Cell::new(3.0_f64));
    let reading = proximity.clone();
    run(
        "dynamic, proximity 3.0 -> 0",
        ThrottleMode::Dynamic,
        RateSource::proximity_fn(move || {
            let p = reading.get();
            reading.set((p - 0.5).max(0.0));
            p
        }),
        ThrottleConfig::LEADING,
    )?;
    println!("final proximity {}", proximity.get());
    Ok(())
}
