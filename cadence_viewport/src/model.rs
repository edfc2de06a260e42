// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The proximity model and its cached geometry.

use crate::layout::Layout;
use crate::offset::VisibilityOffset;

/// Geometry captured by the last [`ViewportProximityModel::recalculate_defaults`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewportState {
    /// Document `y` of the target's top edge.
    pub target_top: f64,
    /// Target height.
    pub target_height: f64,
    /// Viewport height.
    pub viewport_height: f64,
    /// Offset applied in visibility checks.
    pub offset: VisibilityOffset,
}

impl ViewportState {
    /// Half the target height.
    pub fn half_target(&self) -> f64 {
        self.target_height / 2.0
    }

    /// Half the viewport height.
    pub fn half_viewport(&self) -> f64 {
        self.viewport_height / 2.0
    }

    /// Document `y` of the target's center.
    pub fn target_center(&self) -> f64 {
        self.target_top + self.half_target()
    }

    /// Edge-to-edge distance between viewport and target at `scroll`, offset included.
    ///
    /// Zero or negative means visible.
    pub fn adjusted_distance(&self, scroll: f64) -> f64 {
        let viewport_center = scroll + self.half_viewport();
        let center_gap = (viewport_center - self.target_center()).abs();
        let edge_gap = center_gap - self.half_viewport() - self.half_target();
        edge_gap + self.offset.adjustment(self.target_height)
    }
}

/// Tracks one target against a vertically scrolling viewport.
///
/// [`check_target_in_viewport`](Self::check_target_in_viewport) answers the
/// visibility question for a scroll offset and caches the normalized distance
/// read by [`viewport_distance_from_target`](Self::viewport_distance_from_target).
/// The distance is in viewport heights: `0.0` when visible, `1.0` when the
/// target is one full viewport away.
///
/// Queries before [`initialize`](Self::initialize) log a warning and report
/// "not visible, zero distance".
#[derive(Debug)]
pub struct ViewportProximityModel<L> {
    layout: Option<L>,
    offset: VisibilityOffset,
    state: Option<ViewportState>,
    distance: f64,
}

impl<L> Default for ViewportProximityModel<L> {
    fn default() -> Self {
        Self {
            layout: None,
            offset: VisibilityOffset::None,
            state: None,
            distance: 0.0,
        }
    }
}

impl<L: Layout> ViewportProximityModel<L> {
    /// An uninitialized model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the target layout and offset, then compute the cached geometry.
    ///
    /// Calling it again replaces the target.
    pub fn initialize(&mut self, layout: L, offset: VisibilityOffset) {
        self.layout = Some(layout);
        self.offset = offset;
        self.distance = 0.0;
        self.recalculate_defaults();
    }

    /// Whether [`initialize`](Self::initialize) has been called.
    pub fn is_initialized(&self) -> bool {
        self.layout.is_some()
    }

    /// Recompute cached geometry from the current layout.
    ///
    /// Call after the target moves or the viewport resizes.
    pub fn recalculate_defaults(&mut self) {
        let Some(layout) = &self.layout else {
            tracing::warn!("viewport proximity model used before initialize");
            return;
        };
        let bounds = layout.target_bounds();
        let state = ViewportState {
            target_top: bounds.y0,
            target_height: bounds.height(),
            viewport_height: layout.viewport_height(),
            offset: self.offset,
        };
        tracing::debug!(
            target_top = state.target_top,
            target_height = state.target_height,
            viewport_height = state.viewport_height,
            offset = %state.offset,
            "viewport geometry recalculated"
        );
        self.state = Some(state);
    }

    /// Whether the target counts as visible with the viewport scrolled to `scroll`.
    ///
    /// Also updates the cached distance.
    pub fn check_target_in_viewport(&mut self, scroll: f64) -> bool {
        let Some(state) = self.state else {
            tracing::warn!("viewport proximity model used before initialize");
            self.distance = 0.0;
            return false;
        };
        let d = state.adjusted_distance(scroll);
        if d.is_nan() {
            tracing::warn!(scroll, "non-finite visibility distance; target not visible");
            self.distance = 0.0;
            return false;
        }
        if d <= 0.0 {
            self.distance = 0.0;
            return true;
        }
        self.distance = if state.viewport_height > 0.0 {
            d / state.viewport_height
        } else {
            tracing::warn!(
                viewport_height = state.viewport_height,
                "non-positive viewport height; proximity reported as zero"
            );
            0.0
        };
        tracing::trace!(scroll, distance = self.distance, "target outside viewport");
        false
    }

    /// Normalized distance from the last visibility check. Never negative.
    pub fn viewport_distance_from_target(&self) -> f64 {
        self.distance
    }

    /// Cached geometry, if initialized.
    pub fn state(&self) -> Option<ViewportState> {
        self.state
    }
}
