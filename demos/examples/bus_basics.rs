// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bus basics.
//!
//! Two typed channels, an `on_all` tap, a next-tick dispatch, and teardown.
//!
//! Run:
//! - `cargo run -p cadence_demos --example bus_basics`
//! - `RUST_LOG=debug cargo run -p cadence_demos --example bus_basics` to see lifecycle logs

use cadence_bus::{DispatchMode, Dispatcher, EventBus, EventRecord, Listener, Source};
use cadence_timer::Scheduler;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum Ui {
    Scroll,
    Resize,
}

/// Publishes without being able to subscribe.
fn produce(out: &impl Dispatcher<Ui, f64>) {
    out.dispatch(Ui::Scroll, 120.0);
    out.dispatch(Ui::Resize, 1024.0);
    out.dispatch_with(Ui::Scroll, 240.0, DispatchMode::NextTick);
    out.dispatch(Ui::Scroll, 360.0);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let scheduler = Scheduler::new();
    let bus: EventBus<Ui, f64> = EventBus::with_scheduler(scheduler.clone());
    println!("created {}", bus.id());

    let listener: &dyn Listener<Ui, f64> = &bus;
    let _scroll = listener.on(Ui::Scroll).subscribe_with(
        |r: &EventRecord<Ui, f64>| println!("  scroll -> {}", r.payload()),
        || println!("  scroll channel completed"),
    );
    let _resize = listener
        .on(Ui::Resize)
        .subscribe(|r: &EventRecord<Ui, f64>| println!("  resize -> {}", r.payload()));
    let _tap = listener
        .on_all()
        .subscribe(|r: &EventRecord<Ui, f64>| {
            println!("  [all] {:?} {}", r.event_type(), r.payload());
        });

    println!(
        "subscribers: scroll={} resize={} total={}",
        bus.subscriber_count(Some(&Ui::Scroll)),
        bus.subscriber_count(Some(&Ui::Resize)),
        bus.subscriber_count(None)
    );

    println!("== Dispatch ==");
    produce(&bus);
    println!("== Next tick ==");
    scheduler.run_ready();

    println!("== Destroy ==");
    bus.destroy();
    bus.dispatch(Ui::Scroll, 480.0);
    println!("subscribers after destroy: {}", bus.subscriber_count(None));
}
