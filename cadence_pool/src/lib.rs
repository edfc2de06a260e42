// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence Pool: recycle short-lived visual indicators instead of churning them.
//!
//! High event rates rendered one indicator per event would allocate and destroy
//! a view per event. An [`IndicatorPool`] keeps released views on a bounded free
//! list for reuse and empties that list once a burst is over:
//!
//! - [`IndicatorPool::acquire`] reuses the most recently released handle or
//!   creates one through the [`IndicatorRenderer`].
//! - [`IndicatorPool::release`] returns a handle when its animation ends; beyond
//!   [`PoolConfig::capacity`] free handles it is destroyed instead.
//! - Each acquire (or [`IndicatorPool::touch`]) restarts an idle countdown of
//!   [`PoolConfig::idle_eviction_delay`]; on expiry the free list is destroyed
//!   unless eviction is held. Active handles are never touched.
//!
//! [`EventIndicator`] wires a pool to an event bus: every record of one type
//! acquires an indicator and bumps a counter, records of a second type reset
//! the counter.
//!
//! This crate uses `std`. Pools are `Rc` handles and are not `Send`.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use cadence_pool::{IndicatorPool, IndicatorRenderer, PoolConfig};
//! use cadence_timer::Scheduler;
//!
//! #[derive(Default)]
//! struct Labels(u32);
//!
//! impl IndicatorRenderer for Labels {
//!     type Handle = (u32, String);
//!     type Key = u32;
//!     type Tag = String;
//!
//!     fn create(&mut self, tag: &String) -> (u32, String) {
//!         self.0 += 1;
//!         (self.0, tag.clone())
//!     }
//!     fn reset(&mut self, handle: &mut (u32, String), tag: &String) {
//!         handle.1.clone_from(tag);
//!     }
//!     fn key(&self, handle: &(u32, String)) -> u32 {
//!         handle.0
//!     }
//!     fn destroy(&mut self, _handle: (u32, String)) {}
//! }
//!
//! let scheduler = Scheduler::new();
//! let pool = IndicatorPool::new(Labels::default(), scheduler.clone(), PoolConfig::default());
//!
//! let key = pool.acquire(&"scroll".to_string()).unwrap();
//! pool.release(&key);
//! assert_eq!(pool.free_len(), 1);
//!
//! scheduler.advance(Duration::from_secs(20));
//! assert_eq!(pool.free_len(), 0);
//! ```

mod config;
mod indicator;
mod pool;
mod renderer;

pub use config::PoolConfig;
pub use indicator::EventIndicator;
pub use pool::{IndicatorPool, PoolStats};
pub use renderer::IndicatorRenderer;
