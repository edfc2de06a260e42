// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interval sources: fixed values, the dynamic formula, and proximity readers.

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;
use std::time::Duration;

use cadence_viewport::{Layout, ViewportProximityModel};

/// Something that reports how far the tracked target is from the viewport.
///
/// Units are viewport heights: `0.0` means in view. The controller treats a
/// negative or non-finite reading as unavailable and keeps its last known value.
pub trait ProximitySource {
    /// Current proximity factor.
    fn proximity(&self) -> f64;
}

impl<L: Layout> ProximitySource for ViewportProximityModel<L> {
    fn proximity(&self) -> f64 {
        self.viewport_distance_from_target()
    }
}

impl<P: ProximitySource> ProximitySource for RefCell<P> {
    fn proximity(&self) -> f64 {
        match self.try_borrow() {
            Ok(p) => p.proximity(),
            Err(_) => {
                tracing::warn!("proximity source is mutably borrowed; reading skipped");
                f64::NAN
            }
        }
    }
}

/// Adapts a closure into a [`ProximitySource`].
#[derive(Clone, Copy)]
pub struct ProximityFn<F>(pub F);

impl<F> fmt::Debug for ProximityFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProximityFn")
    }
}

impl<F: Fn() -> f64> ProximitySource for ProximityFn<F> {
    fn proximity(&self) -> f64 {
        (self.0)()
    }
}

/// Optional interval argument to
/// [`ThrottleController::set_mode`](crate::ThrottleController::set_mode).
#[derive(Clone, Default)]
pub enum RateSource {
    /// Use the controller's base interval (fixed mode) or its bound proximity
    /// source (dynamic mode).
    #[default]
    Default,
    /// Fixed interval in milliseconds. Negative or NaN values become `0`.
    Fixed(f64),
    /// Proximity reader for dynamic mode.
    Proximity(Rc<dyn ProximitySource>),
}

impl RateSource {
    /// Wrap a closure as a proximity rate source.
    pub fn proximity_fn(f: impl Fn() -> f64 + 'static) -> Self {
        Self::Proximity(Rc::new(ProximityFn(f)))
    }
}

impl fmt::Debug for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Fixed(ms) => f.debug_tuple("Fixed").field(ms).finish(),
            Self::Proximity(_) => f.write_str("Proximity(..)"),
        }
    }
}

/// Clamp bounds for the dynamic interval.
///
/// `interval = clamp(base × proximity × proximity_scale, base × min_factor, max_interval_ms)`.
/// When `base × min_factor` exceeds `max_interval_ms`, the ceiling wins.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DynamicRate {
    /// Floor as a fraction of the base interval. Default: 0.8.
    pub min_factor: f64,
    /// Ceiling in milliseconds. Default: 350.
    pub max_interval_ms: f64,
    /// Weight applied to the proximity reading. Default: 1.0.
    pub proximity_scale: f64,
}

impl Default for DynamicRate {
    fn default() -> Self {
        Self {
            min_factor: 0.8,
            max_interval_ms: 350.0,
            proximity_scale: 1.0,
        }
    }
}

impl DynamicRate {
    /// Interval in milliseconds for `base_ms` and a proximity reading.
    pub fn interval_ms(&self, base_ms: f64, proximity: f64) -> f64 {
        let ceiling = sanitize_ms(self.max_interval_ms);
        let floor = sanitize_ms(base_ms * self.min_factor).min(ceiling);
        // NaN products fall to the floor.
        (base_ms * proximity * self.proximity_scale).max(floor).min(ceiling)
    }
}

/// Floor negative and NaN millisecond values to zero.
pub(crate) fn sanitize_ms(ms: f64) -> f64 {
    if ms.is_nan() || ms < 0.0 { 0.0 } else { ms }
}

/// Convert sanitized milliseconds to a [`Duration`], saturating on overflow.
#[allow(
    clippy::cast_possible_truncation,
    reason = "value is rounded, non-negative, and checked against u64::MAX first"
)]
pub(crate) fn ms_to_duration(ms: f64) -> Duration {
    let nanos = (sanitize_ms(ms) * 1_000_000.0).round();
    if nanos >= u64::MAX as f64 {
        Duration::MAX
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_interval_clamps_to_floor_and_ceiling() {
        let rate = DynamicRate::default();
        assert_eq!(rate.interval_ms(60.0, 0.5), 48.0);
        assert_eq!(rate.interval_ms(60.0, 0.0), 48.0);
        assert_eq!(rate.interval_ms(60.0, 2.0), 120.0);
        assert_eq!(rate.interval_ms(60.0, 10.0), 350.0);
    }

    #[test]
    fn ceiling_wins_over_a_large_floor() {
        let rate = DynamicRate::default();
        // Floor would be 800.
        assert_eq!(rate.interval_ms(1000.0, 0.0), 350.0);
    }

    #[test]
    fn proximity_scale_weights_the_reading() {
        let rate = DynamicRate {
            proximity_scale: 1.4,
            ..DynamicRate::default()
        };
        assert!((rate.interval_ms(100.0, 2.0) - 280.0).abs() < 1e-9);
    }

    #[test]
    fn nan_proximity_falls_to_floor() {
        assert_eq!(DynamicRate::default().interval_ms(60.0, f64::NAN), 48.0);
    }

    #[test]
    fn sanitize_and_convert() {
        assert_eq!(sanitize_ms(-5.0), 0.0);
        assert_eq!(sanitize_ms(f64::NAN), 0.0);
        assert_eq!(ms_to_duration(150.0), Duration::from_millis(150));
        assert_eq!(ms_to_duration(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn closures_and_cells_read_proximity() {
        let src = ProximityFn(|| 0.75);
        assert_eq!(src.proximity(), 0.75);
        let cell = RefCell::new(ProximityFn(|| 1.5));
        assert_eq!(cell.proximity(), 1.5);
        let guard = cell.borrow_mut();
        assert!(cell.proximity().is_nan());
        drop(guard);
    }
}
