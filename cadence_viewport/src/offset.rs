// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visibility offsets: how much of the target must be on screen to count as visible.

use core::fmt;
use core::str::FromStr;

/// Adjustment applied to the edge-to-edge distance before the visibility test.
///
/// A positive value demands that part of the target be inside the viewport
/// before it counts as visible. A negative value counts the target as visible
/// while it is still that far outside the viewport.
///
/// Textual form: `"100%"`, `"10px"`, `"-20px"`, or empty for [`None`](Self::None).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum VisibilityOffset {
    /// Touching the viewport edge is enough.
    #[default]
    None,
    /// Percentage of the target height.
    Percent(f64),
    /// Absolute distance in layout units.
    Pixels(f64),
}

impl VisibilityOffset {
    /// Distance added to the edge-to-edge distance for a target of `target_height`.
    pub fn adjustment(self, target_height: f64) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Percent(pct) => target_height * pct / 100.0,
            Self::Pixels(px) => px,
        }
    }
}

/// Error returned when a visibility offset string cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseOffsetError {
    /// The text has neither a `%` nor a `px` suffix.
    #[error("visibility offset {0:?} must end in `%` or `px`")]
    MissingUnit(String),
    /// The numeric part is not a finite number.
    #[error("visibility offset {0:?} has an invalid number")]
    InvalidNumber(String),
}

impl FromStr for VisibilityOffset {
    type Err = ParseOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Ok(Self::None);
        }
        let (number, ctor): (&str, fn(f64) -> Self) = if let Some(n) = text.strip_suffix('%') {
            (n, Self::Percent)
        } else if let Some(n) = text.strip_suffix("px") {
            (n, Self::Pixels)
        } else {
            return Err(ParseOffsetError::MissingUnit(s.to_owned()));
        };
        match number.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(ctor(v)),
            _ => Err(ParseOffsetError::InvalidNumber(s.to_owned())),
        }
    }
}

impl fmt::Display for VisibilityOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Percent(v) => write!(f, "{v}%"),
            Self::Pixels(v) => write!(f, "{v}px"),
        }
    }
}

impl TryFrom<String> for VisibilityOffset {
    type Error = ParseOffsetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VisibilityOffset> for String {
    fn from(value: VisibilityOffset) -> Self {
        value.to_string()
    }
}
