// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core bus types: records, dispatch modes, instance ids, and capability traits.
//!
//! ## Overview
//!
//! These types describe what flows through an [`EventBus`](crate::bus::EventBus)
//! and the two narrow views collaborators are handed: a [`Dispatcher`] that may
//! only publish, and a [`Listener`] that may only subscribe.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::subject::EventStream;

/// A dispatched event: its logical type plus an opaque payload.
///
/// Records are immutable once built and are delivered to observers by reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord<T, P> {
    event_type: T,
    payload: P,
}

impl<T, P> EventRecord<T, P> {
    /// Build a record.
    pub fn new(event_type: T, payload: P) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Logical type used to select the channel.
    pub fn event_type(&self) -> &T {
        &self.event_type
    }

    /// Payload supplied by the dispatcher.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Split into type and payload.
    pub fn into_parts(self) -> (T, P) {
        (self.event_type, self.payload)
    }
}

/// When a dispatched record reaches observers.
///
/// The distinction is observable: an `Immediate` record is delivered before
/// `dispatch_with` returns, a `NextTick` record after any work already queued
/// for the current tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum DispatchMode {
    /// Deliver synchronously on the caller's execution context.
    #[default]
    Immediate,
    /// Defer delivery to the next scheduler tick.
    NextTick,
}

/// Unique identity of a bus instance, assigned at construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BusId(u64);

impl BusId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for BusId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "bus#{}", self.0)
    }
}

/// Publish-only capability.
///
/// Hand this to collaborators that produce events but must never observe them.
pub trait Dispatcher<T, P> {
    /// Deliver a record synchronously.
    fn dispatch(&self, event_type: T, payload: P);

    /// Deliver a record with an explicit [`DispatchMode`].
    fn dispatch_with(&self, event_type: T, payload: P, mode: DispatchMode);
}

/// Subscribe-only capability.
///
/// Hand this to collaborators that consume events but must never publish.
pub trait Listener<T, P> {
    /// Stream of records whose type equals `event_type`.
    fn on(&self, event_type: T) -> EventStream<EventRecord<T, P>>;

    /// Stream of every dispatched record.
    fn on_all(&self) -> EventStream<EventRecord<T, P>>;
}
