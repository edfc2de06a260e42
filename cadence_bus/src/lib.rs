// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence Bus: a typed, in-process publish/subscribe multiplexer.
//!
//! Components that should not know about each other exchange events through an
//! [`EventBus`]. Producers dispatch `(type, payload)` records; consumers observe
//! the records of one type, or all records.
//!
//! - One master stream carries every record.
//! - Per-type channels are created lazily on the first [`EventBus::on`] call and
//!   shared by every later subscriber of that type.
//! - Delivery is synchronous by default. [`DispatchMode::NextTick`] defers a
//!   record to the next tick of a [`cadence_timer::Scheduler`].
//! - [`EventBus::destroy`] completes every stream exactly once.
//!
//! The stream primitives ([`Subject`], [`EventStream`], [`Subscription`], [`Observer`])
//! live in [`subject`] and are reused by the throttling and pooling crates.
//!
//! ## Capabilities
//!
//! [`Dispatcher`] and [`Listener`] split publish and subscribe rights so a
//! collaborator can be handed only the half it needs.
//!
//! ## Minimal example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use cadence_bus::{EventBus, EventRecord, Source};
//!
//! #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
//! enum Ui {
//!     Scroll,
//!     Resize,
//! }
//!
//! let bus: EventBus<Ui, f64> = EventBus::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = bus
//!     .on(Ui::Scroll)
//!     .subscribe(move |r: &EventRecord<Ui, f64>| sink.borrow_mut().push(*r.payload()));
//!
//! bus.dispatch(Ui::Scroll, 12.0);
//! bus.dispatch(Ui::Resize, 800.0);
//! bus.dispatch(Ui::Scroll, 24.0);
//!
//! assert_eq!(*seen.borrow(), vec![12.0, 24.0]);
//! assert_eq!(bus.subscriber_count(Some(&Ui::Scroll)), 1);
//!
//! bus.destroy();
//! assert_eq!(bus.subscriber_count(None), 0);
//! ```
//!
//! This crate uses `std`. Everything here is single-threaded: handles are
//! `Rc`-based and neither `Send` nor `Sync`.

pub mod bus;
pub mod subject;
pub mod types;

pub use bus::EventBus;
pub use subject::{
    EventStream, FnObserver, Observer, SharedObserver, Source, Subject, Subscription,
    observer_fn, observer_with,
};
pub use types::{BusId, DispatchMode, Dispatcher, EventRecord, Listener};
