// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence Timer: a deterministic, single-threaded virtual-time scheduler.
//!
//! ## Overview
//!
//! Every deferred callback in the Cadence crates (throttle windows, next-tick
//! dispatch, idle eviction countdowns) is scheduled on a [`Scheduler`].
//! The scheduler owns a virtual clock that only moves when the host says so,
//! which keeps every timing decision reproducible in tests.
//!
//! - [`Scheduler::schedule`] enqueues a `FnOnce()` after a delay and returns a [`TimerId`].
//! - [`Scheduler::cancel`] removes a pending timer. Ids are generational, so a
//!   stale id never cancels an unrelated timer that reused its slot.
//! - [`Scheduler::advance`] / [`Scheduler::advance_to`] move the clock forward and
//!   run every timer that falls due, in deadline order (ties keep scheduling order).
//!
//! A host running against a wall clock calls [`Scheduler::advance_to`] with the
//! elapsed time of its own monotonic clock once per loop iteration.
//!
//! ## Re-entrancy
//!
//! Callbacks run with the queue released. A callback may schedule, cancel, or
//! read the clock; timers scheduled inside a callback that fall due within the
//! current horizon run in the same call.
//!
//! ## Minimal example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use cadence_timer::Scheduler;
//!
//! let scheduler = Scheduler::new();
//! let fired = Rc::new(Cell::new(false));
//! let flag = fired.clone();
//! let id = scheduler.schedule(Duration::from_millis(100), move || flag.set(true));
//!
//! scheduler.advance(Duration::from_millis(99));
//! assert!(!fired.get());
//! scheduler.advance(Duration::from_millis(1));
//! assert!(fired.get());
//! assert!(!scheduler.cancel(id), "fired timers cannot be canceled");
//! ```
//!
//! This crate uses `std`. The scheduler is `Rc`-shared and is not `Send`.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

/// Generational handle of a scheduled timer.
///
/// A slot index plus a generation counter. When a timer fires or is canceled its
/// slot is freed; reusing the slot bumps the generation, so older ids go stale.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TimerId(u32, u32);

impl TimerId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Timer ids use 32-bit slot indices."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Generation counter of the slot this id refers to.
    pub const fn generation(self) -> u32 {
        self.1
    }
}

type Callback = Box<dyn FnOnce()>;

struct Entry {
    generation: u32,
    callback: Callback,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    deadline: Duration,
    seq: u64,
    id: TimerId,
}

#[derive(Default)]
struct TimerQueue {
    now: Duration,
    seq: u64,
    entries: Vec<Option<Entry>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    heap: BinaryHeap<Reverse<QueueKey>>,
    live: usize,
}

impl TimerQueue {
    fn insert(&mut self, delay: Duration, callback: Callback) -> TimerId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.entries[idx] = Some(Entry {
                generation,
                callback,
            });
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.entries.push(Some(Entry {
                generation,
                callback,
            }));
            self.generations.push(generation);
            (self.entries.len() - 1, generation)
        };
        let id = TimerId::new(idx, generation);
        let deadline = self.now.saturating_add(delay);
        self.heap.push(Reverse(QueueKey {
            deadline,
            seq: self.seq,
            id,
        }));
        self.seq += 1;
        self.live += 1;
        id
    }

    fn is_pending(&self, id: TimerId) -> bool {
        matches!(self.entries.get(id.idx()), Some(Some(e)) if e.generation == id.generation())
    }

    fn take(&mut self, id: TimerId) -> Option<Callback> {
        if !self.is_pending(id) {
            return None;
        }
        let entry = self.entries[id.idx()].take()?;
        self.free_list.push(id.idx());
        self.live -= 1;
        Some(entry.callback)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        let canceled = self.take(id).is_some();
        if canceled {
            self.compact_if_sparse();
        }
        canceled
    }

    /// Drop heap keys of canceled timers once they dominate the heap.
    fn compact_if_sparse(&mut self) {
        if self.heap.len() > 64 && self.heap.len() > self.live * 2 {
            let entries = &self.entries;
            self.heap.retain(|Reverse(key)| {
                matches!(
                    entries.get(key.id.idx()),
                    Some(Some(e)) if e.generation == key.id.generation()
                )
            });
        }
    }

    /// Pop the earliest live timer due at or before `limit`, advancing the clock to it.
    fn pop_due(&mut self, limit: Option<Duration>) -> Option<Callback> {
        while let Some(Reverse(key)) = self.heap.peek().copied() {
            if limit.is_some_and(|limit| key.deadline > limit) {
                return None;
            }
            self.heap.pop();
            if let Some(callback) = self.take(key.id) {
                self.now = self.now.max(key.deadline);
                return Some(callback);
            }
        }
        None
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.heap
            .iter()
            .filter(|Reverse(key)| self.is_pending(key.id))
            .map(|Reverse(key)| key.deadline)
            .min()
    }
}

/// Cloneable handle to a shared virtual-time timer queue.
///
/// All clones observe the same clock and the same pending timers.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<TimerQueue>>,
}

impl core::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let q = self.queue.borrow();
        f.debug_struct("Scheduler")
            .field("now", &q.now)
            .field("pending", &q.live)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler whose clock starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    /// Number of timers waiting to fire.
    pub fn pending(&self) -> usize {
        self.queue.borrow().live
    }

    /// Deadline of the earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.borrow().next_deadline()
    }

    /// Schedule `callback` to run once `delay` has elapsed.
    ///
    /// A zero delay defers the callback to the next tick: it runs on the next
    /// [`run_ready`](Self::run_ready) or clock advance, never synchronously.
    pub fn schedule(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        let id = self.queue.borrow_mut().insert(delay, Box::new(callback));
        tracing::trace!(?id, ?delay, "timer scheduled");
        id
    }

    /// Cancel a pending timer. Returns `false` if it already fired, was already
    /// canceled, or the id is stale.
    pub fn cancel(&self, id: TimerId) -> bool {
        let canceled = self.queue.borrow_mut().cancel(id);
        if canceled {
            tracing::trace!(?id, "timer canceled");
        }
        canceled
    }

    /// Whether `id` still refers to a pending timer.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.queue.borrow().is_pending(id)
    }

    /// Move the clock forward by `by`, running every timer that falls due.
    ///
    /// Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        self.advance_to(target)
    }

    /// Move the clock forward to `target`, running every timer that falls due.
    ///
    /// A `target` in the past only runs timers already due; the clock never
    /// moves backwards. Returns the number of callbacks run.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut ran = 0;
        loop {
            // The borrow ends before the callback runs so it can re-enter.
            let next = self.queue.borrow_mut().pop_due(Some(target));
            let Some(callback) = next else {
                break;
            };
            callback();
            ran += 1;
        }
        let mut q = self.queue.borrow_mut();
        q.now = q.now.max(target);
        ran
    }

    /// Run timers due at the current instant, including zero-delay ones.
    pub fn run_ready(&self) -> usize {
        self.advance_to(self.now())
    }

    /// Run every pending timer, advancing the clock to each deadline in turn.
    ///
    /// Timers that keep rescheduling themselves prevent this from returning.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_due(None);
            let Some(callback) = next else {
                break;
            };
            callback();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn recorder() -> (Rc<RefCell<Vec<(&'static str, Duration)>>>, Scheduler) {
        (Rc::new(RefCell::new(Vec::new())), Scheduler::new())
    }

    #[test]
    fn fires_in_deadline_order_with_stable_ties() {
        let (log, s) = recorder();
        for (name, delay) in [("c", 30), ("a", 10), ("b1", 20), ("b2", 20)] {
            let log = log.clone();
            let clock = s.clone();
            let _ = s.schedule(ms(delay), move || log.borrow_mut().push((name, clock.now())));
        }
        assert_eq!(s.advance(ms(25)), 3);
        assert_eq!(
            *log.borrow(),
            vec![("a", ms(10)), ("b1", ms(20)), ("b2", ms(20))]
        );
        assert_eq!(s.now(), ms(25));
        assert_eq!(s.pending(), 1);
        assert_eq!(s.next_deadline(), Some(ms(30)));
    }

    #[test]
    fn zero_delay_waits_for_next_tick() {
        let s = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        let _ = s.schedule(Duration::ZERO, move || f.set(true));
        assert!(!fired.get());
        assert_eq!(s.run_ready(), 1);
        assert!(fired.get());
        assert_eq!(s.now(), Duration::ZERO);
    }

    #[test]
    fn cancel_is_idempotent_and_generational() {
        let s = Scheduler::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let first = s.schedule(ms(10), move || h.set(h.get() + 1));
        assert!(s.cancel(first));
        assert!(!s.cancel(first));

        // The freed slot is reused with a bumped generation.
        let h = hits.clone();
        let second = s.schedule(ms(10), move || h.set(h.get() + 10));
        assert_ne!(first, second);
        assert!(second.generation() > first.generation());
        assert!(!s.cancel(first), "stale id must not cancel the new timer");
        assert!(s.is_pending(second));

        s.advance(ms(10));
        assert_eq!(hits.get(), 10);
    }

    #[test]
    fn callbacks_can_reschedule_within_horizon() {
        let (log, s) = recorder();
        let inner_log = log.clone();
        let handle = s.clone();
        let _ = s.schedule(ms(10), move || {
            inner_log.borrow_mut().push(("outer", handle.now()));
            let log = inner_log.clone();
            let clock = handle.clone();
            let _ = handle.schedule(ms(5), move || log.borrow_mut().push(("inner", clock.now())));
        });
        assert_eq!(s.advance(ms(20)), 2);
        assert_eq!(*log.borrow(), vec![("outer", ms(10)), ("inner", ms(15))]);
    }

    #[test]
    fn callbacks_can_cancel_sibling_timers() {
        let s = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        let victim = s.schedule(ms(20), move || f.set(true));
        let handle = s.clone();
        let _ = s.schedule(ms(10), move || {
            assert!(handle.cancel(victim), "victim should still be pending");
        });
        s.run_until_idle();
        assert!(!fired.get());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn clock_never_moves_backwards() {
        let s = Scheduler::new();
        s.advance(ms(50));
        s.advance_to(ms(10));
        assert_eq!(s.now(), ms(50));
    }

    #[test]
    fn run_until_idle_jumps_to_each_deadline() {
        let (log, s) = recorder();
        for (name, delay) in [("late", 500), ("early", 5)] {
            let log = log.clone();
            let clock = s.clone();
            let _ = s.schedule(ms(delay), move || log.borrow_mut().push((name, clock.now())));
        }
        assert_eq!(s.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec![("early", ms(5)), ("late", ms(500))]);
        assert_eq!(s.now(), ms(500));
    }

    #[test]
    fn heavy_cancel_churn_keeps_heap_compact() {
        let s = Scheduler::new();
        let mut last = None;
        for _ in 0..1_000 {
            if let Some(id) = last.take() {
                assert!(s.cancel(id));
            }
            last = Some(s.schedule(ms(20_000), || {}));
        }
        assert_eq!(s.pending(), 1);
        assert!(s.queue.borrow().heap.len() <= 130);
        assert_eq!(s.run_until_idle(), 1);
    }
}
