// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Setup-time failures.

/// Error returned by [`ThrottleControllerBuilder::build`](crate::ThrottleControllerBuilder::build).
///
/// Steady-state operations never fail; only wiring mistakes are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ThrottleError {
    /// No raw event source was supplied.
    #[error("throttle controller needs a raw event source")]
    MissingSource,
    /// No scheduler was supplied for gating windows.
    #[error("throttle controller needs a scheduler for its gating windows")]
    MissingScheduler,
}
