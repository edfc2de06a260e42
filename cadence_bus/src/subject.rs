// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multicast primitives: observers, subjects, streams, and subscriptions.
//!
//! ## Overview
//!
//! A [`Subject`] pushes values synchronously to every attached [`Observer`], in
//! attachment order, on the caller's execution context. There is no replay:
//! an observer only sees values pushed while it is attached.
//!
//! A value pushed from inside an observer callback is queued and delivered to
//! every observer once the current value has been fanned out, so each observer
//! sees values in push order and no nested push is lost.
//!
//! [`Subject::complete`] is the termination signal. It runs once; every attached
//! observer gets [`Observer::complete`], its [`Subscription`] reports closed, and
//! later subscribers are completed immediately.
//!
//! ## Subscriptions
//!
//! [`Subscription`] is the RAII handle returned by every subscribe call.
//! Unsubscribing (explicitly or by dropping the handle) takes effect before the
//! call returns: the observer is skipped for any value still being delivered and
//! removed from the subject. Use [`Subscription::detach`] to keep an observer
//! attached for the lifetime of the subject.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Receiver of pushed values.
pub trait Observer<E> {
    /// Called for every value delivered while attached.
    fn next(&mut self, value: &E);

    /// Called once when the upstream terminates.
    fn complete(&mut self) {}
}

/// Type-erased observer shared between a subject and its in-flight deliveries.
pub type SharedObserver<E> = Rc<RefCell<dyn Observer<E>>>;

/// Observer built from closures.
///
/// Returned by [`observer_fn`] and [`observer_with`]; most callers use
/// [`Source::subscribe`] instead.
pub struct FnObserver<N, C> {
    next: N,
    complete: Option<C>,
}

impl<N, C> core::fmt::Debug for FnObserver<N, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnObserver")
            .field("completed", &self.complete.is_none())
            .finish_non_exhaustive()
    }
}

impl<E, N: FnMut(&E), C: FnOnce()> Observer<E> for FnObserver<N, C> {
    fn next(&mut self, value: &E) {
        (self.next)(value);
    }

    fn complete(&mut self) {
        if let Some(complete) = self.complete.take() {
            complete();
        }
    }
}

/// Observer that only handles values.
pub fn observer_fn<E, N: FnMut(&E)>(next: N) -> FnObserver<N, fn()> {
    FnObserver {
        next,
        complete: None,
    }
}

/// Observer that handles values and the termination signal.
pub fn observer_with<E, N: FnMut(&E), C: FnOnce()>(next: N, complete: C) -> FnObserver<N, C> {
    FnObserver {
        next,
        complete: Some(complete),
    }
}

/// Handle to an attached observer.
///
/// Dropping the handle unsubscribes. [`is_closed`](Self::is_closed) reports
/// whether the subscription ended, either by unsubscribing or because the
/// upstream completed.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    closed: Rc<Cell<bool>>,
    teardown: Option<Box<dyn FnOnce()>>,
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.closed.get())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// A subscription that runs `teardown` once when unsubscribed.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self::with_flag(Rc::new(Cell::new(false)), teardown)
    }

    /// A subscription that is already closed.
    pub fn closed() -> Self {
        Self {
            closed: Rc::new(Cell::new(true)),
            teardown: None,
        }
    }

    /// Wrap `inner`, running `teardown` after `inner` is unsubscribed.
    ///
    /// The returned handle shares `inner`'s closed state.
    pub fn chain(mut inner: Self, teardown: impl FnOnce() + 'static) -> Self {
        let closed = inner.closed.clone();
        let inner_teardown = inner.teardown.take();
        Self::with_flag(closed, move || {
            if let Some(t) = inner_teardown {
                t();
            }
            teardown();
        })
    }

    fn with_flag(closed: Rc<Cell<bool>>, teardown: impl FnOnce() + 'static) -> Self {
        Self {
            closed,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Whether the subscription has ended.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Stop receiving values. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            self.closed.set(true);
            teardown();
        }
    }

    /// Give up the handle without unsubscribing.
    ///
    /// The observer stays attached until the upstream completes.
    pub fn detach(mut self) {
        self.teardown = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Anything an observer can subscribe to.
///
/// This is the whole contract a push-style producer must satisfy to feed the
/// bus or a throttle controller.
pub trait Source<E> {
    /// Attach a type-erased observer.
    fn attach(&self, observer: SharedObserver<E>) -> Subscription;

    /// Attach an observer value.
    fn subscribe_observer(&self, observer: impl Observer<E> + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.attach(Rc::new(RefCell::new(observer)))
    }

    /// Attach a closure that receives every value.
    fn subscribe(&self, next: impl FnMut(&E) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe_observer(observer_fn::<E, _>(next))
    }

    /// Attach closures for values and for the termination signal.
    fn subscribe_with(
        &self,
        next: impl FnMut(&E) + 'static,
        complete: impl FnOnce() + 'static,
    ) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe_observer(observer_with::<E, _, _>(next, complete))
    }
}

struct Slot<E> {
    id: u64,
    closed: Rc<Cell<bool>>,
    observer: SharedObserver<E>,
}

struct SubjectState<E> {
    slots: Vec<Slot<E>>,
    next_id: u64,
    completed: bool,
    delivering: bool,
    // Values pushed while `delivering`, drained in FIFO order.
    queue: VecDeque<Rc<E>>,
}

// Clears the delivery flag even if an observer panics.
struct Delivering<'a, E>(&'a RefCell<SubjectState<E>>);

impl<E> Drop for Delivering<'_, E> {
    fn drop(&mut self) {
        if let Ok(mut st) = self.0.try_borrow_mut() {
            st.delivering = false;
            st.queue.clear();
        }
    }
}

/// Synchronous multicast endpoint.
///
/// Cloning yields another handle to the same endpoint.
pub struct Subject<E> {
    state: Rc<RefCell<SubjectState<E>>>,
}

impl<E> Clone for Subject<E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<E> Default for Subject<E> {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(SubjectState {
                slots: Vec::new(),
                next_id: 0,
                completed: false,
                delivering: false,
                queue: VecDeque::new(),
            })),
        }
    }
}

impl<E> core::fmt::Debug for Subject<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("Subject")
            .field("observers", &st.slots.len())
            .field("completed", &st.completed)
            .finish_non_exhaustive()
    }
}

impl<E> Subject<E> {
    /// Terminate the subject. Idempotent.
    pub fn complete(&self) {
        let slots = {
            let mut st = self.state.borrow_mut();
            if st.completed {
                return;
            }
            st.completed = true;
            st.queue.clear();
            core::mem::take(&mut st.slots)
        };
        for slot in &slots {
            slot.closed.set(true);
        }
        for slot in slots {
            if let Ok(mut o) = slot.observer.try_borrow_mut() {
                o.complete();
            }
        }
    }

    /// Whether [`complete`](Self::complete) has run.
    pub fn is_completed(&self) -> bool {
        self.state.borrow().completed
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.state.borrow().slots.len()
    }
}

impl<E: 'static> Subject<E> {
    /// Create an open subject with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `value` to every attached observer.
    ///
    /// Called from inside an observer of this subject, the value is cloned and
    /// delivered after the current one. No-op once completed.
    pub fn next(&self, value: &E)
    where
        E: Clone,
    {
        if self.skip_or_enqueue(|| Rc::new(value.clone())) {
            return;
        }
        self.run(value);
    }

    /// Push an already shared value; queued without cloning when nested.
    pub(crate) fn next_shared(&self, value: Rc<E>) {
        if self.skip_or_enqueue(|| value.clone()) {
            return;
        }
        self.run(&value);
    }

    // True when the caller must not deliver: completed, or queued behind the current value.
    fn skip_or_enqueue(&self, value: impl FnOnce() -> Rc<E>) -> bool {
        let mut st = self.state.borrow_mut();
        if st.completed {
            return true;
        }
        if st.delivering {
            st.queue.push_back(value());
            tracing::trace!(queued = st.queue.len(), "nested push queued");
            return true;
        }
        st.delivering = true;
        false
    }

    fn run(&self, first: &E) {
        let _guard = Delivering(&*self.state);
        self.fan_out(first);
        loop {
            let queued = self.state.borrow_mut().queue.pop_front();
            let Some(value) = queued else {
                break;
            };
            self.fan_out(&value);
        }
    }

    fn fan_out(&self, value: &E) {
        let snapshot: Vec<(Rc<Cell<bool>>, SharedObserver<E>)> = {
            let st = self.state.borrow();
            if st.completed {
                return;
            }
            st.slots
                .iter()
                .map(|s| (s.closed.clone(), s.observer.clone()))
                .collect()
        };
        for (closed, observer) in snapshot {
            // Unsubscribed by an earlier observer during this delivery.
            if closed.get() {
                continue;
            }
            match observer.try_borrow_mut() {
                Ok(mut o) => o.next(value),
                Err(_) => {
                    tracing::warn!("observer re-entered from another source; value skipped");
                }
            }
        }
    }

    /// Subscribe-only view of this subject.
    pub fn stream(&self) -> EventStream<E> {
        EventStream {
            subject: self.clone(),
        }
    }
}

impl<E: 'static> Source<E> for Subject<E> {
    fn attach(&self, observer: SharedObserver<E>) -> Subscription {
        let closed = Rc::new(Cell::new(false));
        {
            let mut st = self.state.borrow_mut();
            if !st.completed {
                let id = st.next_id;
                st.next_id += 1;
                st.slots.push(Slot {
                    id,
                    closed: closed.clone(),
                    observer,
                });
                drop(st);
                let weak = Rc::downgrade(&self.state);
                return Subscription::with_flag(closed, move || {
                    let Some(state) = weak.upgrade() else {
                        return;
                    };
                    let removed = {
                        let mut st = state.borrow_mut();
                        st.slots
                            .iter()
                            .position(|s| s.id == id)
                            .map(|i| st.slots.remove(i))
                    };
                    // Dropped outside the borrow: the observer may own subscriptions of its own.
                    drop(removed);
                });
            }
        }
        if let Ok(mut o) = observer.try_borrow_mut() {
            o.complete();
        }
        Subscription::closed()
    }
}

/// Subscribe-only handle to a [`Subject`].
///
/// Returned by [`Subject::stream`] and by the bus's `on`/`on_all`.
pub struct EventStream<E> {
    subject: Subject<E>,
}

impl<E> Clone for EventStream<E> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
        }
    }
}

impl<E> core::fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("EventStream").field(&self.subject).finish()
    }
}

impl<E: 'static> EventStream<E> {
    /// Number of observers attached to the underlying subject.
    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }

    /// Whether the underlying subject has terminated.
    pub fn is_completed(&self) -> bool {
        self.subject.is_completed()
    }
}

impl<E: 'static> Source<E> for EventStream<E> {
    fn attach(&self, observer: SharedObserver<E>) -> Subscription {
        self.subject.attach(observer)
    }
}
