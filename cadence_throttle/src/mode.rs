// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Throttle modes and edge configuration.

use core::fmt;

/// Gating policy applied between the raw source and the derived stream.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ThrottleMode {
    /// Pass-through: every upstream event is forwarded.
    #[default]
    None,
    /// Gate with a fixed interval.
    Fixed,
    /// Gate with an interval recomputed from proximity before each window.
    Dynamic,
}

impl fmt::Display for ThrottleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Fixed => "fixed",
            Self::Dynamic => "dynamic",
        })
    }
}

bitflags::bitflags! {
    /// Which window edges emit.
    ///
    /// The default is leading only.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ThrottleConfig: u8 {
        /// Emit the first event of a quiet period immediately and open a window.
        const LEADING  = 0b0000_0001;
        /// Emit the latest suppressed event when the window closes.
        const TRAILING = 0b0000_0010;
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::LEADING
    }
}

impl ThrottleConfig {
    /// Build from the two edge toggles.
    pub fn from_edges(leading: bool, trailing: bool) -> Self {
        let mut config = Self::empty();
        config.set(Self::LEADING, leading);
        config.set(Self::TRAILING, trailing);
        config
    }

    /// Whether the leading edge emits.
    pub fn leading(self) -> bool {
        self.contains(Self::LEADING)
    }

    /// Whether the trailing edge emits.
    pub fn trailing(self) -> bool {
        self.contains(Self::TRAILING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_leading_only() {
        let c = ThrottleConfig::default();
        assert!(c.leading());
        assert!(!c.trailing());
    }

    #[test]
    fn from_edges_sets_both_flags() {
        assert_eq!(ThrottleConfig::from_edges(true, true), ThrottleConfig::all());
        assert_eq!(ThrottleConfig::from_edges(false, true), ThrottleConfig::TRAILING);
        assert!(ThrottleConfig::from_edges(false, false).is_empty());
    }
}
