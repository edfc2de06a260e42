// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event bus implementation.
//!
//! ## Overview
//!
//! One master [`Subject`] receives every dispatched record. The first
//! [`EventBus::on`] call for a type creates that type's channel: a subject fed
//! by a filtering observer on the master. Later calls share the channel, so the
//! filtering work is done once per type no matter how many observers attach.
//! [`EventBus::on_all`] observers sit on a channel fed by an unfiltered observer.
//!
//! Records dispatched from inside an observer are queued on the master and
//! delivered once the current record has reached every channel. Every observer
//! therefore sees records in dispatch order.
//!
//! ## Lifecycle
//!
//! [`EventBus::destroy`] completes every channel, then the master. It runs at
//! most once, either explicitly or when the last handle to the bus is dropped.
//! After destruction `dispatch` is a no-op and `on`/`on_all` return streams that
//! terminate subscribers immediately.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Duration;

use cadence_timer::Scheduler;

use crate::subject::{EventStream, Source, Subject, Subscription};
use crate::types::{BusId, DispatchMode, Dispatcher, EventRecord, Listener};

struct Channel<T, P> {
    subject: Subject<EventRecord<T, P>>,
    // Filtering observer on the master; dropped with the channel.
    _forward: Subscription,
}

impl<T: 'static, P: 'static> Channel<T, P> {
    fn feed(
        master: &Subject<Rc<EventRecord<T, P>>>,
        accepts: impl Fn(&T) -> bool + 'static,
    ) -> Self {
        let subject = Subject::new();
        let sink = subject.clone();
        let forward = master.subscribe(move |record: &Rc<EventRecord<T, P>>| {
            if accepts(record.event_type()) {
                sink.next_shared(record.clone());
            }
        });
        Self {
            subject,
            _forward: forward,
        }
    }
}

struct BusInner<T, P> {
    id: BusId,
    // Records are shared so channels can queue them without cloning payloads.
    master: Subject<Rc<EventRecord<T, P>>>,
    all: Channel<T, P>,
    channels: RefCell<HashMap<T, Channel<T, P>>>,
    destroyed: Cell<bool>,
    scheduler: Option<Scheduler>,
}

impl<T, P> BusInner<T, P>
where
    T: Clone + Eq + Hash + core::fmt::Debug + 'static,
    P: 'static,
{
    fn dispatch_now(&self, event_type: T, payload: P) {
        if self.destroyed.get() {
            tracing::trace!(bus = %self.id, ?event_type, "dispatch after destroy ignored");
            return;
        }
        self.master.next(&Rc::new(EventRecord::new(event_type, payload)));
    }
}

impl<T, P> BusInner<T, P> {
    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        let channels = core::mem::take(&mut *self.channels.borrow_mut());
        let count = channels.len();
        for (_, channel) in channels {
            channel.subject.complete();
        }
        self.all.subject.complete();
        self.master.complete();
        tracing::debug!(bus = %self.id, channels = count, "event bus destroyed");
    }
}

impl<T, P> Drop for BusInner<T, P> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Typed publish/subscribe multiplexer.
///
/// `T` is the logical event type (usually a field-less enum or a `&'static str`),
/// `P` the payload. Cloning yields another handle to the same bus.
///
/// ## Usage
///
/// - [`EventBus::new`] for synchronous delivery only, or
///   [`EventBus::with_scheduler`] to also support [`DispatchMode::NextTick`].
/// - [`EventBus::on`] / [`EventBus::on_all`] to observe.
/// - [`EventBus::dispatch`] / [`EventBus::dispatch_with`] to publish.
/// - [`EventBus::subscriber_count`] to inspect per-type observers.
pub struct EventBus<T, P> {
    inner: Rc<BusInner<T, P>>,
}

impl<T, P> Clone for EventBus<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: core::fmt::Debug, P> core::fmt::Debug for EventBus<T, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("id", &self.inner.id)
            .field("channels", &self.inner.channels.borrow().len())
            .field("destroyed", &self.inner.destroyed.get())
            .finish_non_exhaustive()
    }
}

impl<T, P> Default for EventBus<T, P>
where
    T: Clone + Eq + Hash + core::fmt::Debug + 'static,
    P: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> EventBus<T, P>
where
    T: Clone + Eq + Hash + core::fmt::Debug + 'static,
    P: 'static,
{
    /// Create a bus without a scheduler. `NextTick` dispatch degrades to immediate.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a bus that defers `NextTick` dispatch on `scheduler`.
    pub fn with_scheduler(scheduler: Scheduler) -> Self {
        Self::build(Some(scheduler))
    }

    fn build(scheduler: Option<Scheduler>) -> Self {
        let id = BusId::next();
        tracing::debug!(bus = %id, deferred = scheduler.is_some(), "event bus created");
        let master = Subject::new();
        let all = Channel::feed(&master, |_| true);
        Self {
            inner: Rc::new(BusInner {
                id,
                master,
                all,
                channels: RefCell::new(HashMap::new()),
                destroyed: Cell::new(false),
                scheduler,
            }),
        }
    }

    /// Identity of this bus instance.
    pub fn id(&self) -> BusId {
        self.inner.id
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Deliver a record synchronously to the matching channel and to `on_all` observers.
    ///
    /// Records of a type nobody has called [`on`](Self::on) for only reach `on_all`
    /// observers. No-op after destroy.
    pub fn dispatch(&self, event_type: T, payload: P) {
        self.inner.dispatch_now(event_type, payload);
    }

    /// Deliver a record now or on the next scheduler tick.
    ///
    /// A deferred record is dropped if the bus is destroyed before the tick.
    pub fn dispatch_with(&self, event_type: T, payload: P, mode: DispatchMode) {
        match (mode, &self.inner.scheduler) {
            (DispatchMode::Immediate, _) => self.dispatch(event_type, payload),
            (DispatchMode::NextTick, Some(scheduler)) => {
                if self.is_destroyed() {
                    return;
                }
                let weak = Rc::downgrade(&self.inner);
                let _ = scheduler.schedule(Duration::ZERO, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.dispatch_now(event_type, payload);
                    }
                });
            }
            (DispatchMode::NextTick, None) => {
                tracing::warn!(
                    bus = %self.inner.id,
                    ?event_type,
                    "next-tick dispatch on a bus without a scheduler; delivering immediately"
                );
                self.dispatch(event_type, payload);
            }
        }
    }

    /// Stream of records of `event_type`.
    ///
    /// The first call for a type creates its channel; later calls share it.
    pub fn on(&self, event_type: T) -> EventStream<EventRecord<T, P>> {
        if self.is_destroyed() {
            tracing::debug!(bus = %self.inner.id, ?event_type, "on() after destroy");
            return terminated();
        }
        let mut channels = self.inner.channels.borrow_mut();
        if let Some(channel) = channels.get(&event_type) {
            return channel.subject.stream();
        }
        let wanted = event_type.clone();
        let channel = Channel::feed(&self.inner.master, move |t| *t == wanted);
        tracing::debug!(bus = %self.inner.id, ?event_type, "channel created");
        let stream = channel.subject.stream();
        channels.insert(event_type, channel);
        stream
    }

    /// Stream of every dispatched record, regardless of type.
    pub fn on_all(&self) -> EventStream<EventRecord<T, P>> {
        self.inner.all.subject.stream()
    }

    /// Live observer count of one channel, or of all channels when `event_type` is `None`.
    ///
    /// Observers attached through [`on_all`](Self::on_all) are not counted.
    pub fn subscriber_count(&self, event_type: Option<&T>) -> usize {
        let channels = self.inner.channels.borrow();
        match event_type {
            Some(t) => channels.get(t).map_or(0, |c| c.subject.observer_count()),
            None => channels.values().map(|c| c.subject.observer_count()).sum(),
        }
    }

    /// Complete every channel and the master stream. Idempotent.
    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

fn terminated<E: 'static>() -> EventStream<E> {
    let subject = Subject::new();
    subject.complete();
    subject.stream()
}

impl<T, P> Dispatcher<T, P> for EventBus<T, P>
where
    T: Clone + Eq + Hash + core::fmt::Debug + 'static,
    P: 'static,
{
    fn dispatch(&self, event_type: T, payload: P) {
        Self::dispatch(self, event_type, payload);
    }

    fn dispatch_with(&self, event_type: T, payload: P, mode: DispatchMode) {
        Self::dispatch_with(self, event_type, payload, mode);
    }
}

impl<T, P> Listener<T, P> for EventBus<T, P>
where
    T: Clone + Eq + Hash + core::fmt::Debug + 'static,
    P: 'static,
{
    fn on(&self, event_type: T) -> EventStream<EventRecord<T, P>> {
        Self::on(self, event_type)
    }

    fn on_all(&self) -> EventStream<EventRecord<T, P>> {
        Self::on_all(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    enum Kind {
        One,
        Two,
        Three,
    }

    type Log = Rc<RefCell<Vec<i32>>>;

    fn listen(bus: &EventBus<Kind, i32>, kind: Kind) -> (Log, Subscription) {
        let log: Log = Rc::default();
        let sink = log.clone();
        let sub = bus
            .on(kind)
            .subscribe(move |r: &EventRecord<Kind, i32>| sink.borrow_mut().push(*r.payload()));
        (log, sub)
    }

    #[test]
    fn subscribe_dispatch_destroy() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let mut ones = Vec::new();
        let mut twos = Vec::new();
        for _ in 0..5 {
            ones.push(listen(&bus, Kind::One));
            twos.push(listen(&bus, Kind::Two));
        }
        assert_eq!(bus.subscriber_count(None), 10);
        assert_eq!(bus.subscriber_count(Some(&Kind::One)), 5);
        assert_eq!(bus.subscriber_count(Some(&Kind::Two)), 5);

        for j in 1..=10 {
            bus.dispatch(Kind::One, j);
            bus.dispatch(Kind::Two, -j);
        }

        let mut handled = 0;
        for (log, _) in &ones {
            let log = log.borrow();
            assert_eq!(log.first(), Some(&1));
            assert_eq!(log.last(), Some(&10));
            handled += log.len();
        }
        for (log, _) in &twos {
            let log = log.borrow();
            assert_eq!(log.first(), Some(&-1));
            assert_eq!(log.last(), Some(&-10));
            handled += log.len();
        }
        assert_eq!(handled, 100);

        bus.destroy();
        assert_eq!(bus.subscriber_count(None), 0);
        assert!(ones.iter().chain(&twos).all(|(_, sub)| sub.is_closed()));
    }

    #[test]
    fn channel_is_created_once_and_shared() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let (_a, _sa) = listen(&bus, Kind::One);
        let (_b, _sb) = listen(&bus, Kind::One);
        // Two channel observers, but a single filtering observer on the master
        // next to the one feeding `on_all`.
        assert_eq!(bus.inner.channels.borrow().len(), 1);
        assert_eq!(bus.inner.master.observer_count(), 2);
    }

    #[test]
    fn untyped_records_only_reach_on_all() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let all: Log = Rc::default();
        let sink = all.clone();
        let _all_sub = bus
            .on_all()
            .subscribe(move |r: &EventRecord<Kind, i32>| sink.borrow_mut().push(*r.payload()));
        bus.dispatch(Kind::Three, 3);
        let (three, _s) = listen(&bus, Kind::Three);
        bus.dispatch(Kind::Three, 4);
        assert_eq!(*all.borrow(), vec![3, 4]);
        assert_eq!(*three.borrow(), vec![4]);
        assert_eq!(bus.subscriber_count(None), 1, "on_all is excluded");
    }

    #[test]
    fn unsubscribe_decrements_synchronously() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let (log, mut sub) = listen(&bus, Kind::One);
        bus.dispatch(Kind::One, 1);
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(Some(&Kind::One)), 0);
        bus.dispatch(Kind::One, 2);
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn destroy_is_idempotent_and_silences_dispatch() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let completions = Rc::new(Cell::new(0));
        let c = completions.clone();
        let _sub = bus
            .on(Kind::One)
            .subscribe_with(|_| panic!("nothing after destroy"), move || c.set(c.get() + 1));
        let c = completions.clone();
        let _all = bus.on_all().subscribe_with(|_| panic!("nothing after destroy"), move || {
            c.set(c.get() + 1);
        });
        bus.destroy();
        bus.destroy();
        assert_eq!(completions.get(), 2);
        bus.dispatch(Kind::One, 1);

        let late = bus.on(Kind::One).subscribe(|_| {});
        assert!(late.is_closed());
        assert_eq!(bus.subscriber_count(None), 0);
    }

    #[test]
    fn dropping_last_handle_terminates_subscribers() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let (_log, sub) = listen(&bus, Kind::Two);
        drop(bus);
        assert!(sub.is_closed());
    }

    #[test]
    fn next_tick_defers_until_scheduler_runs() {
        let scheduler = Scheduler::new();
        let bus: EventBus<Kind, i32> = EventBus::with_scheduler(scheduler.clone());
        let (log, _sub) = listen(&bus, Kind::One);
        bus.dispatch_with(Kind::One, 1, DispatchMode::NextTick);
        bus.dispatch_with(Kind::One, 2, DispatchMode::Immediate);
        assert_eq!(*log.borrow(), vec![2]);
        scheduler.run_ready();
        assert_eq!(*log.borrow(), vec![2, 1]);
    }

    #[test]
    fn next_tick_record_dropped_if_destroyed_first() {
        let scheduler = Scheduler::new();
        let bus: EventBus<Kind, i32> = EventBus::with_scheduler(scheduler.clone());
        let (log, _sub) = listen(&bus, Kind::One);
        bus.dispatch_with(Kind::One, 1, DispatchMode::NextTick);
        bus.destroy();
        scheduler.run_ready();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn next_tick_without_scheduler_delivers_immediately() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let (log, _sub) = listen(&bus, Kind::One);
        bus.dispatch_with(Kind::One, 5, DispatchMode::NextTick);
        assert_eq!(*log.borrow(), vec![5]);
    }

    #[test]
    fn observers_may_dispatch_reentrantly() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let (twos, _s2) = listen(&bus, Kind::Two);
        let relay = bus.clone();
        let _s1 = bus.on(Kind::One).subscribe(move |r: &EventRecord<Kind, i32>| {
            relay.dispatch(Kind::Two, r.payload() * 10);
        });
        bus.dispatch(Kind::One, 4);
        assert_eq!(*twos.borrow(), vec![40]);
    }

    #[test]
    fn same_type_dispatch_from_observer_reaches_every_subscriber() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let relay = bus.clone();
        let first: Log = Rc::default();
        let sink = first.clone();
        let _s1 = bus.on(Kind::One).subscribe(move |r: &EventRecord<Kind, i32>| {
            sink.borrow_mut().push(*r.payload());
            if *r.payload() == 1 {
                relay.dispatch(Kind::One, 2);
            }
        });
        let (second, _s2) = listen(&bus, Kind::One);
        let all: Log = Rc::default();
        let sink = all.clone();
        let _all = bus
            .on_all()
            .subscribe(move |r: &EventRecord<Kind, i32>| sink.borrow_mut().push(*r.payload()));

        bus.dispatch(Kind::One, 1);
        assert_eq!(*first.borrow(), vec![1, 2]);
        assert_eq!(*second.borrow(), vec![1, 2]);
        assert_eq!(*all.borrow(), vec![1, 2]);
    }

    #[test]
    fn capability_views_share_one_bus() {
        let bus: EventBus<Kind, i32> = EventBus::new();
        let dispatcher: Rc<dyn Dispatcher<Kind, i32>> = Rc::new(bus.clone());
        let listener: Rc<dyn Listener<Kind, i32>> = Rc::new(bus.clone());
        let log: Log = Rc::default();
        let sink = log.clone();
        let _sub = listener
            .on(Kind::Three)
            .subscribe(move |r: &EventRecord<Kind, i32>| sink.borrow_mut().push(*r.payload()));
        dispatcher.dispatch(Kind::Three, 9);
        assert_eq!(*log.borrow(), vec![9]);
    }

    #[test]
    fn instances_have_distinct_ids() {
        let a: EventBus<Kind, i32> = EventBus::new();
        let b: EventBus<Kind, i32> = EventBus::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }
}
