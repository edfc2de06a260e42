// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The throttle controller, its builder, and the derived stream.
//!
//! ## Bindings
//!
//! A binding is the live link between the raw source and the derived stream:
//! one upstream subscription plus, in gated modes, one gate. Every mode switch
//! drops the current binding (unsubscribing upstream and canceling any open
//! window, which discards a pending trailing event) before creating the next.
//! A binding exists only while the derived stream has subscribers.

use core::cell::RefCell;
use core::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use cadence_bus::{Observer, SharedObserver, Source, Subject, Subscription};
use cadence_timer::{Scheduler, TimerId};

use crate::error::ThrottleError;
use crate::mode::{ThrottleConfig, ThrottleMode};
use crate::rate::{DynamicRate, ProximitySource, RateSource, ms_to_duration, sanitize_ms};
use crate::settings::ThrottleSettings;

struct State {
    mode: ThrottleMode,
    config: ThrottleConfig,
    fixed_ms: Option<f64>,
    base_ms: f64,
    dynamic: DynamicRate,
    proximity: Option<Rc<dyn ProximitySource>>,
    last_proximity: f64,
    subscribers: usize,
}

struct Gate<E> {
    config: ThrottleConfig,
    window: Option<TimerId>,
    pending: Option<E>,
}

struct Binding<E> {
    _upstream: Subscription,
    gate: Option<Rc<RefCell<Gate<E>>>>,
    scheduler: Scheduler,
}

impl<E> Drop for Binding<E> {
    fn drop(&mut self) {
        if let Some(gate) = &self.gate {
            let mut g = gate.borrow_mut();
            if let Some(id) = g.window.take() {
                self.scheduler.cancel(id);
            }
            if g.pending.take().is_some() {
                tracing::debug!("pending trailing event discarded");
            }
        }
    }
}

struct Inner<E> {
    source: Rc<dyn Source<E>>,
    scheduler: Scheduler,
    downstream: Subject<E>,
    state: RefCell<State>,
    binding: RefCell<Option<Binding<E>>>,
}

impl<E> Inner<E> {
    fn unbind(&self) {
        let old = self.binding.borrow_mut().take();
        if old.is_some() {
            tracing::debug!("raw source detached");
        }
        // Dropped outside the borrow: unsubscribing may run arbitrary teardown.
        drop(old);
    }
}

impl<E> Drop for Inner<E> {
    fn drop(&mut self) {
        drop(self.binding.get_mut().take());
        self.downstream.complete();
    }
}

impl<E: Clone + 'static> Inner<E> {
    fn bind(this: &Rc<Self>) {
        let (mode, config) = {
            let st = this.state.borrow();
            (st.mode, st.config)
        };
        let gate = match mode {
            ThrottleMode::None => None,
            ThrottleMode::Fixed | ThrottleMode::Dynamic => Some(Rc::new(RefCell::new(Gate {
                config,
                window: None,
                pending: None,
            }))),
        };
        let observer = UpstreamObserver {
            inner: Rc::downgrade(this),
            gate: gate.clone(),
        };
        let upstream = this.source.attach(Rc::new(RefCell::new(observer)));
        if upstream.is_closed() {
            tracing::debug!(%mode, "raw source already completed; nothing to attach");
            return;
        }
        tracing::debug!(%mode, ?config, "raw source attached");
        *this.binding.borrow_mut() = Some(Binding {
            _upstream: upstream,
            gate,
            scheduler: this.scheduler.clone(),
        });
    }

    fn rebind(this: &Rc<Self>) {
        this.unbind();
        if this.state.borrow().subscribers > 0 {
            Self::bind(this);
        }
    }

    /// Length of the window about to open.
    fn window_interval(&self) -> Duration {
        let (mode, fixed_ms, base_ms, dynamic, source, last) = {
            let st = self.state.borrow();
            (
                st.mode,
                st.fixed_ms,
                st.base_ms,
                st.dynamic,
                st.proximity.clone(),
                st.last_proximity,
            )
        };
        let ms = match mode {
            ThrottleMode::None => 0.0,
            ThrottleMode::Fixed => fixed_ms.unwrap_or(base_ms),
            ThrottleMode::Dynamic => {
                let proximity = match source.map(|s| s.proximity()) {
                    Some(p) if p.is_finite() && p >= 0.0 => {
                        self.state.borrow_mut().last_proximity = p;
                        p
                    }
                    Some(p) => {
                        tracing::warn!(
                            reading = p,
                            last,
                            "unusable proximity reading; using last known"
                        );
                        last
                    }
                    None => last,
                };
                dynamic.interval_ms(base_ms, proximity)
            }
        };
        tracing::trace!(%mode, interval_ms = ms, "gating window opened");
        ms_to_duration(ms)
    }

    fn gate_event(this: &Rc<Self>, gate: &Rc<RefCell<Gate<E>>>, event: &E) {
        let window_open = gate.borrow().window.is_some();
        if window_open {
            let mut g = gate.borrow_mut();
            if g.config.trailing() {
                g.pending = Some(event.clone());
            }
            tracing::trace!("event suppressed inside window");
            return;
        }
        let interval = this.window_interval();
        let weak_inner = Rc::downgrade(this);
        let weak_gate = Rc::downgrade(gate);
        let id = this
            .scheduler
            .schedule(interval, move || close_window(&weak_inner, &weak_gate));
        let emit_now = {
            let mut g = gate.borrow_mut();
            g.window = Some(id);
            if g.config.leading() {
                true
            } else {
                if g.config.trailing() {
                    g.pending = Some(event.clone());
                }
                false
            }
        };
        if emit_now {
            this.downstream.next(event);
        }
    }
}

fn close_window<E: Clone + 'static>(inner: &Weak<Inner<E>>, gate: &Weak<RefCell<Gate<E>>>) {
    let (Some(inner), Some(gate)) = (inner.upgrade(), gate.upgrade()) else {
        return;
    };
    let pending = {
        let mut g = gate.borrow_mut();
        g.window = None;
        g.pending.take()
    };
    if let Some(event) = pending {
        tracing::trace!("trailing edge emitted");
        inner.downstream.next(&event);
    }
}

struct UpstreamObserver<E> {
    inner: Weak<Inner<E>>,
    gate: Option<Rc<RefCell<Gate<E>>>>,
}

impl<E: Clone + 'static> Observer<E> for UpstreamObserver<E> {
    fn next(&mut self, event: &E) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        match &self.gate {
            None => inner.downstream.next(event),
            Some(gate) => Inner::gate_event(&inner, gate, event),
        }
    }

    fn complete(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            tracing::debug!("raw source completed");
            inner.unbind();
        }
    }
}

/// Rate-limits a raw push source according to a switchable [`ThrottleMode`].
///
/// Cloning yields another handle to the same controller. Subscribe through
/// [`stream`](Self::stream); the raw source is attached only while that stream
/// has subscribers.
///
/// ## Gating
///
/// In `Fixed` and `Dynamic` modes an event arriving with no open window opens
/// one. With [`ThrottleConfig::LEADING`] it is emitted at once. Events arriving
/// inside the window are suppressed; with [`ThrottleConfig::TRAILING`] the
/// latest of them is emitted when the window closes. A trailing emission does
/// not open a new window.
///
/// `Fixed` windows last the interval given to [`set_mode`](Self::set_mode), or the
/// base interval when none was given. `Dynamic` windows last
/// [`DynamicRate::interval_ms`] of the base interval and the current proximity
/// reading. Interval changes apply from the next window on.
pub struct ThrottleController<E> {
    inner: Rc<Inner<E>>,
}

impl<E> Clone for ThrottleController<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for ThrottleController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.state.borrow();
        f.debug_struct("ThrottleController")
            .field("mode", &st.mode)
            .field("config", &st.config)
            .field("base_interval_ms", &st.base_ms)
            .field("subscribers", &st.subscribers)
            .field("attached", &self.inner.binding.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl<E: Clone + 'static> ThrottleController<E> {
    /// Start configuring a controller.
    pub fn builder() -> ThrottleControllerBuilder<E> {
        ThrottleControllerBuilder::default()
    }

    /// Switch mode, rebinding the raw source if the stream is observed.
    ///
    /// `rate` supplies the fixed interval (`Fixed` mode) or the proximity reader
    /// (`Dynamic` mode); a rate that does not fit `mode` is logged and ignored.
    /// Any event pending on the old binding is discarded.
    pub fn set_mode(&self, mode: ThrottleMode, rate: RateSource, config: ThrottleConfig) {
        {
            let mut st = self.inner.state.borrow_mut();
            st.mode = mode;
            st.config = config;
            match (mode, rate) {
                (ThrottleMode::Fixed, RateSource::Default) => st.fixed_ms = None,
                (_, RateSource::Default) => {}
                (ThrottleMode::Fixed, RateSource::Fixed(ms)) => {
                    let sanitized = sanitize_ms(ms);
                    if sanitized != ms {
                        tracing::warn!(requested = ms, "fixed interval floored to 0");
                    }
                    st.fixed_ms = Some(sanitized);
                }
                (ThrottleMode::Dynamic, RateSource::Proximity(source)) => {
                    st.proximity = Some(source);
                }
                (mode, rate) => {
                    tracing::warn!(%mode, ?rate, "rate source does not apply to this mode");
                }
            }
            if mode == ThrottleMode::Dynamic && st.proximity.is_none() {
                tracing::warn!(
                    last_proximity = st.last_proximity,
                    "dynamic throttle without a proximity source; using last known proximity"
                );
            }
            tracing::debug!(%mode, ?config, "throttle mode set");
        }
        Inner::rebind(&self.inner);
    }

    /// Apply a full settings snapshot: base interval, dynamic bounds, then mode and edges.
    pub fn apply_settings(&self, settings: &ThrottleSettings) {
        {
            let mut st = self.inner.state.borrow_mut();
            st.base_ms = sanitize_ms(settings.base_interval_ms);
            st.dynamic = settings.dynamic;
        }
        self.set_mode(settings.mode, RateSource::Default, settings.config());
    }

    /// Set the base interval in milliseconds. Takes effect from the next window.
    ///
    /// Negative or NaN values become `0`.
    pub fn set_base_interval_ms(&self, ms: f64) {
        let sanitized = sanitize_ms(ms);
        if sanitized != ms {
            tracing::warn!(requested = ms, "base interval floored to 0");
        }
        self.inner.state.borrow_mut().base_ms = sanitized;
    }

    /// Base interval in milliseconds.
    pub fn base_interval_ms(&self) -> f64 {
        self.inner.state.borrow().base_ms
    }

    /// Bind the proximity reader used by `Dynamic` mode.
    ///
    /// Takes effect from the next window without rebinding the raw source.
    pub fn bind_proximity(&self, source: Rc<dyn ProximitySource>) {
        self.inner.state.borrow_mut().proximity = Some(source);
    }

    /// Active mode.
    pub fn mode(&self) -> ThrottleMode {
        self.inner.state.borrow().mode
    }

    /// Active edge configuration.
    pub fn config(&self) -> ThrottleConfig {
        self.inner.state.borrow().config
    }

    /// The derived, rate-limited stream.
    pub fn stream(&self) -> ThrottledStream<E> {
        ThrottledStream {
            inner: self.inner.clone(),
        }
    }

    /// Number of live subscriptions to the derived stream.
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.borrow().subscribers
    }

    /// Whether the raw source is currently attached.
    pub fn is_attached(&self) -> bool {
        self.inner.binding.borrow().is_some()
    }

    /// Proximity used for the most recent dynamic window.
    pub fn last_proximity(&self) -> f64 {
        self.inner.state.borrow().last_proximity
    }
}

/// Subscribe-only view of a controller's output.
///
/// The first subscription attaches the raw source; dropping the last one
/// detaches it before `unsubscribe` returns.
pub struct ThrottledStream<E> {
    inner: Rc<Inner<E>>,
}

impl<E> Clone for ThrottledStream<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for ThrottledStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottledStream")
            .field("subscribers", &self.inner.state.borrow().subscribers)
            .finish_non_exhaustive()
    }
}

impl<E: Clone + 'static> Source<E> for ThrottledStream<E> {
    fn attach(&self, observer: SharedObserver<E>) -> Subscription {
        let downstream = self.inner.downstream.attach(observer);
        if downstream.is_closed() {
            return downstream;
        }
        let first = {
            let mut st = self.inner.state.borrow_mut();
            st.subscribers += 1;
            st.subscribers == 1
        };
        if first {
            Inner::bind(&self.inner);
        }
        let weak = Rc::downgrade(&self.inner);
        Subscription::chain(downstream, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let last = {
                let mut st = inner.state.borrow_mut();
                st.subscribers = st.subscribers.saturating_sub(1);
                st.subscribers == 0
            };
            if last {
                inner.unbind();
            }
        })
    }
}

/// Builder for [`ThrottleController`].
///
/// A raw source and a scheduler are required; everything else has defaults
/// (mode `None`, leading edge only, base interval 1000 ms).
pub struct ThrottleControllerBuilder<E> {
    source: Option<Rc<dyn Source<E>>>,
    scheduler: Option<Scheduler>,
    settings: ThrottleSettings,
    proximity: Option<Rc<dyn ProximitySource>>,
}

impl<E> Default for ThrottleControllerBuilder<E> {
    fn default() -> Self {
        Self {
            source: None,
            scheduler: None,
            settings: ThrottleSettings::default(),
            proximity: None,
        }
    }
}

impl<E> fmt::Debug for ThrottleControllerBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleControllerBuilder")
            .field("has_source", &self.source.is_some())
            .field("has_scheduler", &self.scheduler.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<E: Clone + 'static> ThrottleControllerBuilder<E> {
    /// Raw event source to throttle.
    pub fn source(mut self, source: impl Source<E> + 'static) -> Self {
        self.source = Some(Rc::new(source));
        self
    }

    /// Scheduler that times gating windows.
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Base interval in milliseconds.
    pub fn base_interval_ms(mut self, ms: f64) -> Self {
        self.settings.base_interval_ms = ms;
        self
    }

    /// Clamp bounds for `Dynamic` mode.
    pub fn dynamic_rate(mut self, rate: DynamicRate) -> Self {
        self.settings.dynamic = rate;
        self
    }

    /// Proximity reader for `Dynamic` mode.
    pub fn proximity(mut self, source: Rc<dyn ProximitySource>) -> Self {
        self.proximity = Some(source);
        self
    }

    /// Initial settings. Replaces earlier `base_interval_ms` and `dynamic_rate` calls.
    pub fn settings(mut self, settings: ThrottleSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the controller.
    ///
    /// # Errors
    ///
    /// [`ThrottleError::MissingSource`] or [`ThrottleError::MissingScheduler`]
    /// when the corresponding collaborator was not supplied.
    pub fn build(self) -> Result<ThrottleController<E>, ThrottleError> {
        let source = self.source.ok_or(ThrottleError::MissingSource)?;
        let scheduler = self.scheduler.ok_or(ThrottleError::MissingScheduler)?;
        let settings = self.settings;
        let base_ms = sanitize_ms(settings.base_interval_ms);
        tracing::debug!(
            mode = %settings.mode,
            base_interval_ms = base_ms,
            "throttle controller built"
        );
        Ok(ThrottleController {
            inner: Rc::new(Inner {
                source,
                scheduler,
                downstream: Subject::new(),
                state: RefCell::new(State {
                    mode: settings.mode,
                    config: settings.config(),
                    fixed_ms: None,
                    base_ms,
                    dynamic: settings.dynamic,
                    proximity: self.proximity,
                    last_proximity: 0.0,
                    subscribers: 0,
                }),
                binding: RefCell::new(None),
            }),
        })
    }
}
