// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bus-driven indicator panel: one pooled indicator per delivered record.

use core::cell::Cell;
use core::fmt;
use std::rc::Rc;

use cadence_bus::{EventRecord, Listener, Source, Subscription};

use crate::pool::IndicatorPool;
use crate::renderer::IndicatorRenderer;

struct Panel<R: IndicatorRenderer> {
    pool: IndicatorPool<R>,
    tag: R::Tag,
    paused: Cell<bool>,
    count: Cell<u64>,
}

/// Renders every record of one event type as a pooled indicator and keeps a counter.
///
/// A second event type resets the counter. While paused, records are neither
/// rendered nor counted but still restart the pool's idle countdown, and an
/// expiring countdown leaves the free list alone.
///
/// The rendering host reports the end of each indicator's animation through
/// [`pool`](Self::pool)`().release(key)`.
pub struct EventIndicator<R: IndicatorRenderer> {
    panel: Rc<Panel<R>>,
    subscriptions: Vec<Subscription>,
}

impl<R: IndicatorRenderer> fmt::Debug for EventIndicator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventIndicator")
            .field("pool", &self.panel.pool)
            .field("paused", &self.panel.paused.get())
            .field("count", &self.panel.count.get())
            .field("bound", &!self.subscriptions.is_empty())
            .finish_non_exhaustive()
    }
}

impl<R> EventIndicator<R>
where
    R: IndicatorRenderer + 'static,
    R::Tag: 'static,
{
    /// Subscribe `pool` to `indicator_type` records and the counter to `clear_type` records.
    pub fn bind<T, P>(
        bus: &impl Listener<T, P>,
        indicator_type: T,
        clear_type: T,
        pool: IndicatorPool<R>,
        tag: R::Tag,
    ) -> Self
    where
        T: 'static,
        P: 'static,
    {
        let panel = Rc::new(Panel {
            pool,
            tag,
            paused: Cell::new(false),
            count: Cell::new(0),
        });

        let weak = Rc::downgrade(&panel);
        let events = bus
            .on(indicator_type)
            .subscribe(move |_: &EventRecord<T, P>| {
                let Some(panel) = weak.upgrade() else {
                    return;
                };
                if panel.paused.get() {
                    tracing::trace!("indicator paused; record not rendered");
                    panel.pool.touch();
                    return;
                }
                if panel.pool.acquire(&panel.tag).is_some() {
                    panel.count.set(panel.count.get() + 1);
                }
            });

        let weak = Rc::downgrade(&panel);
        let clears = bus.on(clear_type).subscribe(move |_: &EventRecord<T, P>| {
            if let Some(panel) = weak.upgrade() {
                panel.count.set(0);
            }
        });

        Self {
            panel,
            subscriptions: vec![events, clears],
        }
    }

    /// Stop or resume rendering. Idle eviction is held while paused.
    pub fn set_paused(&self, paused: bool) {
        if self.panel.paused.replace(paused) != paused {
            tracing::debug!(paused, "indicator pause toggled");
        }
        self.panel.pool.hold_eviction(paused);
    }

    /// Whether rendering is paused.
    pub fn is_paused(&self) -> bool {
        self.panel.paused.get()
    }

    /// Records rendered since the last reset.
    pub fn event_count(&self) -> u64 {
        self.panel.count.get()
    }

    /// Zero the counter.
    pub fn reset_count(&self) {
        self.panel.count.set(0);
    }

    /// The pool backing this indicator.
    pub fn pool(&self) -> &IndicatorPool<R> {
        &self.panel.pool
    }

    /// Unsubscribe from the bus and destroy the pool. Idempotent.
    pub fn teardown(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        self.subscriptions.clear();
        self.panel.pool.destroy();
        tracing::debug!(count = self.panel.count.get(), "event indicator torn down");
    }
}
