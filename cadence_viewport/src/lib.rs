// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence Viewport: how close a tracked target is to a scrolling viewport.
//!
//! The [`ViewportProximityModel`] answers two questions for a vertical scroll offset:
//!
//! - Is the target visible, under a [`VisibilityOffset`] that can demand part of the
//!   target be on screen (`"100%"`, `"10px"`) or accept targets just off screen (`"-20px"`)?
//! - How far away is it, in viewport heights? `0.0` when visible.
//!
//! The distance is the proximity factor that drives dynamic throttling in `cadence_throttle`.
//!
//! Geometry comes from a [`Layout`] collaborator reporting the target's bounds as a
//! [`kurbo::Rect`] in document space and the viewport height. The model caches it in
//! [`ViewportState`] and only rereads it on
//! [`recalculate_defaults`](ViewportProximityModel::recalculate_defaults), so callers
//! decide when resizes are applied (debouncing is their business).
//!
//! This crate uses `std`: its `std` feature (on by default) enables Kurbo's `std` float math.
//!
//! ## Example
//!
//! ```
//! use cadence_viewport::{FixedLayout, ViewportProximityModel, VisibilityOffset};
//! use kurbo::Rect;
//!
//! let layout = FixedLayout::new(Rect::new(0.0, 2000.0, 320.0, 2100.0), 800.0);
//! let mut model = ViewportProximityModel::new();
//! model.initialize(layout, "-20px".parse::<VisibilityOffset>().unwrap());
//!
//! assert!(!model.check_target_in_viewport(0.0));
//! assert!(model.viewport_distance_from_target() > 1.0);
//!
//! assert!(model.check_target_in_viewport(1500.0));
//! assert_eq!(model.viewport_distance_from_target(), 0.0);
//! ```

mod layout;
mod model;
mod offset;

pub use layout::{FixedLayout, Layout};
pub use model::{ViewportProximityModel, ViewportState};
pub use offset::{ParseOffsetError, VisibilityOffset};
