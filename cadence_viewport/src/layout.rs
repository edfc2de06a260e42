// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout collaborator: where the target is and how tall the viewport is.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Rect;

/// Source of the geometry the proximity model caches.
///
/// Coordinates are document space: `y` grows downward and the scroll offset is
/// the document `y` shown at the top of the viewport.
pub trait Layout {
    /// Bounds of the tracked target in document space.
    fn target_bounds(&self) -> Rect;

    /// Height of the viewport.
    fn viewport_height(&self) -> f64;
}

impl<L: Layout + ?Sized> Layout for &L {
    fn target_bounds(&self) -> Rect {
        (**self).target_bounds()
    }

    fn viewport_height(&self) -> f64 {
        (**self).viewport_height()
    }
}

impl<L: Layout + ?Sized> Layout for Rc<L> {
    fn target_bounds(&self) -> Rect {
        (**self).target_bounds()
    }

    fn viewport_height(&self) -> f64 {
        (**self).viewport_height()
    }
}

impl<L: Layout> Layout for RefCell<L> {
    fn target_bounds(&self) -> Rect {
        self.borrow().target_bounds()
    }

    fn viewport_height(&self) -> f64 {
        self.borrow().viewport_height()
    }
}

/// A layout with explicitly set values.
///
/// Share it as `Rc<RefCell<FixedLayout>>` to move the target or resize the
/// viewport after the model has been initialized, then call
/// [`recalculate_defaults`](crate::ViewportProximityModel::recalculate_defaults).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FixedLayout {
    /// Target bounds in document space.
    pub target: Rect,
    /// Viewport height.
    pub viewport_height: f64,
}

impl FixedLayout {
    /// A layout with the given target bounds and viewport height.
    pub fn new(target: Rect, viewport_height: f64) -> Self {
        Self {
            target,
            viewport_height,
        }
    }
}

impl Layout for FixedLayout {
    fn target_bounds(&self) -> Rect {
        self.target
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }
}
