// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction-time pool configuration.

use std::time::Duration;

/// Pool sizing and eviction policy.
///
/// With the `serde` feature the delay is serialized as whole milliseconds under
/// `idle_eviction_delay_ms`, and missing fields take their defaults.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PoolConfig {
    /// Maximum number of handles kept on the free list. Default: 50.
    pub capacity: usize,
    /// Quiet time after the last acquire before the free list is emptied. Default: 20 s.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "idle_eviction_delay_ms", with = "millis")
    )]
    pub idle_eviction_delay: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            idle_eviction_delay: Duration::from_secs(20),
        }
    }
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
