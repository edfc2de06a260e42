// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence Throttle: adaptive rate control for push event sources.
//!
//! A [`ThrottleController`] sits between a raw, high-frequency source (scroll or
//! redraw notifications) and its consumers. Its derived stream follows one of
//! three [`ThrottleMode`]s, switchable at any time:
//!
//! - `None`: pass-through.
//! - `Fixed`: leading and/or trailing edge gating with a fixed window.
//! - `Dynamic`: the window is recomputed before it opens from the base interval
//!   and a [`ProximitySource`], usually a
//!   [`ViewportProximityModel`](cadence_viewport::ViewportProximityModel):
//!   `clamp(base × proximity, base × 0.8, 350)` with the default [`DynamicRate`].
//!
//! Windows are timed on a [`cadence_timer::Scheduler`]; the controller never blocks.
//! The raw source is attached only while the derived stream has subscribers,
//! and every mode switch replaces the attachment without carrying events over.
//!
//! Only setup can fail ([`ThrottleError`]). Bad numbers at runtime are floored to
//! zero and logged.
//!
//! This crate uses `std` and is single-threaded, like the bus and scheduler it builds on.
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use cadence_bus::{Source, Subject};
//! use cadence_throttle::{RateSource, ThrottleConfig, ThrottleController, ThrottleMode};
//! use cadence_timer::Scheduler;
//!
//! let raw: Subject<u32> = Subject::new();
//! let scheduler = Scheduler::new();
//! let controller = ThrottleController::builder()
//!     .source(raw.clone())
//!     .scheduler(scheduler.clone())
//!     .build()
//!     .unwrap();
//! controller.set_mode(
//!     ThrottleMode::Fixed,
//!     RateSource::Fixed(100.0),
//!     ThrottleConfig::LEADING | ThrottleConfig::TRAILING,
//! );
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = controller.stream().subscribe(move |v: &u32| sink.borrow_mut().push(*v));
//!
//! raw.next(&1);
//! raw.next(&2);
//! raw.next(&3);
//! scheduler.advance(Duration::from_millis(100));
//!
//! assert_eq!(*seen.borrow(), vec![1, 3]);
//! ```

mod controller;
mod error;
mod mode;
mod rate;
mod settings;

pub use controller::{ThrottleController, ThrottleControllerBuilder, ThrottledStream};
pub use error::ThrottleError;
pub use mode::{ThrottleConfig, ThrottleMode};
pub use rate::{DynamicRate, ProximityFn, ProximitySource, RateSource};
pub use settings::ThrottleSettings;
