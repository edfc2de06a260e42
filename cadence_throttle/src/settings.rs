// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Serializable controller settings.

use crate::mode::{ThrottleConfig, ThrottleMode};
use crate::rate::DynamicRate;

/// Everything a settings panel can change on a controller.
///
/// Applied with [`ThrottleController::apply_settings`](crate::ThrottleController::apply_settings).
/// With the `serde` feature every field is optional in the serialized form and
/// falls back to its default.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ThrottleSettings {
    /// Active mode. Default: `None`.
    pub mode: ThrottleMode,
    /// Base interval in milliseconds. Default: 1000.
    pub base_interval_ms: f64,
    /// Emit on the leading edge. Default: true.
    pub leading: bool,
    /// Emit on the trailing edge. Default: false.
    pub trailing: bool,
    /// Dynamic clamp bounds.
    pub dynamic: DynamicRate,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            mode: ThrottleMode::None,
            base_interval_ms: 1000.0,
            leading: true,
            trailing: false,
            dynamic: DynamicRate::default(),
        }
    }
}

impl ThrottleSettings {
    /// Edge flags described by `leading` and `trailing`.
    pub fn config(&self) -> ThrottleConfig {
        ThrottleConfig::from_edges(self.leading, self.trailing)
    }
}
