// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The indicator pool.
//!
//! ## Lifecycle of a handle
//!
//! `acquire` moves a handle into the active map (popping the free list or
//! creating one), `release` moves it back to the free list or destroys it when
//! the free list is full. The free list is LIFO. Idle eviction and `clear_all`
//! destroy handles in bulk.
//!
//! Renderer calls happen with the pool state released.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use cadence_timer::{Scheduler, TimerId};

use crate::config::PoolConfig;
use crate::renderer::IndicatorRenderer;

/// Lifetime counters of a pool.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Handles built by the renderer.
    pub created: u64,
    /// Acquires served from the free list.
    pub reused: u64,
    /// Releases that kept the handle on the free list.
    pub pooled: u64,
    /// Handles handed back to the renderer for destruction.
    pub destroyed: u64,
    /// Idle countdowns that expired and emptied the free list.
    pub evictions: u64,
}

struct PoolState<R: IndicatorRenderer> {
    active: HashMap<R::Key, R::Handle>,
    free: Vec<R::Handle>,
    idle: Option<TimerId>,
    stats: PoolStats,
}

struct PoolInner<R: IndicatorRenderer> {
    renderer: RefCell<R>,
    state: RefCell<PoolState<R>>,
    scheduler: Scheduler,
    config: PoolConfig,
    destroyed: Cell<bool>,
    eviction_held: Cell<bool>,
}

impl<R: IndicatorRenderer> PoolInner<R> {
    fn destroy_all(&self, handles: Vec<R::Handle>) {
        if handles.is_empty() {
            return;
        }
        let n = handles.len() as u64;
        {
            let mut renderer = self.renderer.borrow_mut();
            for handle in handles {
                renderer.destroy(handle);
            }
        }
        self.state.borrow_mut().stats.destroyed += n;
    }

    fn clear_all(&self) {
        let (handles, idle) = {
            let mut st = self.state.borrow_mut();
            let mut handles: Vec<R::Handle> = st.active.drain().map(|(_, h)| h).collect();
            handles.append(&mut st.free);
            (handles, st.idle.take())
        };
        if let Some(id) = idle {
            self.scheduler.cancel(id);
        }
        tracing::debug!(handles = handles.len(), "indicator pool cleared");
        self.destroy_all(handles);
    }

    fn evict_idle(&self) {
        if self.eviction_held.get() {
            self.state.borrow_mut().idle = None;
            tracing::debug!("idle countdown expired while eviction is held; free list kept");
            return;
        }
        let free = {
            let mut st = self.state.borrow_mut();
            st.idle = None;
            st.stats.evictions += 1;
            core::mem::take(&mut st.free)
        };
        tracing::debug!(evicted = free.len(), "idle countdown expired; free list emptied");
        self.destroy_all(free);
    }
}

impl<R: IndicatorRenderer> Drop for PoolInner<R> {
    fn drop(&mut self) {
        if !self.destroyed.get() {
            self.clear_all();
        }
    }
}

/// Bounded pool of renderable indicator handles with idle-based eviction.
///
/// Cloning yields another handle to the same pool. Capacity bounds only the
/// free list; active handles are created on demand without limit.
///
/// Every [`acquire`](Self::acquire) cancels and reschedules the idle countdown.
/// When the countdown expires, every handle on the free list is destroyed.
/// Active handles are never evicted.
pub struct IndicatorPool<R: IndicatorRenderer> {
    inner: Rc<PoolInner<R>>,
}

impl<R: IndicatorRenderer> Clone for IndicatorPool<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: IndicatorRenderer> fmt::Debug for IndicatorPool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.state.borrow();
        f.debug_struct("IndicatorPool")
            .field("config", &self.inner.config)
            .field("active", &st.active.len())
            .field("free", &st.free.len())
            .field("stats", &st.stats)
            .field("destroyed", &self.inner.destroyed.get())
            .finish_non_exhaustive()
    }
}

impl<R: IndicatorRenderer + 'static> IndicatorPool<R> {
    /// Create a pool rendering through `renderer`, timing eviction on `scheduler`.
    pub fn new(renderer: R, scheduler: Scheduler, config: PoolConfig) -> Self {
        tracing::debug!(
            capacity = config.capacity,
            idle_eviction_delay = ?config.idle_eviction_delay,
            "indicator pool created"
        );
        Self {
            inner: Rc::new(PoolInner {
                renderer: RefCell::new(renderer),
                state: RefCell::new(PoolState {
                    active: HashMap::new(),
                    free: Vec::new(),
                    idle: None,
                    stats: PoolStats::default(),
                }),
                scheduler,
                config,
                destroyed: Cell::new(false),
                eviction_held: Cell::new(false),
            }),
        }
    }

    /// Activate a handle showing `tag` and return its key.
    ///
    /// Reuses the most recently released handle when one is free, then restarts
    /// the idle countdown. Returns `None` after [`destroy`](Self::destroy).
    pub fn acquire(&self, tag: &R::Tag) -> Option<R::Key> {
        if self.inner.destroyed.get() {
            tracing::warn!("acquire on a destroyed indicator pool");
            return None;
        }
        let recycled = self.inner.state.borrow_mut().free.pop();
        let reused = recycled.is_some();
        let (handle, key) = {
            let mut renderer = self.inner.renderer.borrow_mut();
            let handle = match recycled {
                Some(mut handle) => {
                    renderer.reset(&mut handle, tag);
                    handle
                }
                None => renderer.create(tag),
            };
            let key = renderer.key(&handle);
            (handle, key)
        };
        let displaced = {
            let mut st = self.inner.state.borrow_mut();
            if reused {
                st.stats.reused += 1;
            } else {
                st.stats.created += 1;
            }
            st.active.insert(key.clone(), handle)
        };
        if let Some(old) = displaced {
            tracing::warn!(?key, "renderer reused a key that is still active; replacing");
            self.inner.destroy_all(vec![old]);
        }
        tracing::trace!(?key, reused, "indicator acquired");
        self.restart_idle();
        Some(key)
    }

    /// Return an active handle once its visual lifecycle has ended.
    ///
    /// The handle goes back on the free list while it has room, otherwise it is
    /// destroyed. An unknown key (a double release, or a release after
    /// destroy) is logged and returns `false`.
    pub fn release(&self, key: &R::Key) -> bool {
        let overflow = {
            let mut st = self.inner.state.borrow_mut();
            let Some(handle) = st.active.remove(key) else {
                drop(st);
                tracing::warn!(?key, "release of an unknown indicator");
                return false;
            };
            if st.free.len() < self.inner.config.capacity {
                st.free.push(handle);
                st.stats.pooled += 1;
                None
            } else {
                Some(handle)
            }
        };
        if let Some(handle) = overflow {
            tracing::trace!(?key, "free list full; indicator destroyed");
            self.inner.destroy_all(vec![handle]);
        }
        true
    }

    /// Restart the idle countdown without acquiring. No-op after destroy.
    pub fn touch(&self) {
        if !self.inner.destroyed.get() {
            self.restart_idle();
        }
    }

    /// While held, an expiring idle countdown keeps the free list.
    ///
    /// The next countdown that expires after the hold is lifted evicts as usual.
    pub fn hold_eviction(&self, held: bool) {
        if self.inner.eviction_held.replace(held) != held {
            tracing::debug!(held, "idle eviction hold changed");
        }
    }

    /// Whether idle eviction is currently held.
    pub fn is_eviction_held(&self) -> bool {
        self.inner.eviction_held.get()
    }

    /// Destroy every active and free handle and cancel the idle countdown.
    ///
    /// The pool stays usable.
    pub fn clear_all(&self) {
        self.inner.clear_all();
    }

    /// Clear the pool and refuse further acquires. Idempotent.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            tracing::debug!("indicator pool already destroyed");
            return;
        }
        self.inner.clear_all();
        tracing::debug!(stats = ?self.stats(), "indicator pool destroyed");
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Number of handles in their visual lifecycle.
    pub fn active_len(&self) -> usize {
        self.inner.state.borrow().active.len()
    }

    /// Number of handles waiting for reuse.
    pub fn free_len(&self) -> usize {
        self.inner.state.borrow().free.len()
    }

    /// Whether an idle countdown is running.
    pub fn is_countdown_pending(&self) -> bool {
        self.inner.state.borrow().idle.is_some()
    }

    /// Configuration the pool was built with.
    pub fn config(&self) -> PoolConfig {
        self.inner.config
    }

    /// Lifetime counters.
    pub fn stats(&self) -> PoolStats {
        self.inner.state.borrow().stats
    }

    fn restart_idle(&self) {
        let previous = self.inner.state.borrow_mut().idle.take();
        if let Some(id) = previous {
            self.inner.scheduler.cancel(id);
        }
        let weak: Weak<PoolInner<R>> = Rc::downgrade(&self.inner);
        let id = self
            .inner
            .scheduler
            .schedule(self.inner.config.idle_eviction_delay, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.evict_idle();
                }
            });
        self.inner.state.borrow_mut().idle = Some(id);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;

    /// Renderer that numbers its handles and records what it destroyed.
    #[derive(Debug, Default)]
    pub(crate) struct Dots {
        next: u32,
        pub(crate) destroyed: Rc<RefCell<Vec<u32>>>,
    }

    #[derive(Debug)]
    pub(crate) struct Dot {
        id: u32,
        pub(crate) color: &'static str,
    }

    impl IndicatorRenderer for Dots {
        type Handle = Dot;
        type Key = u32;
        type Tag = &'static str;

        fn create(&mut self, tag: &&'static str) -> Dot {
            self.next += 1;
            Dot {
                id: self.next,
                color: *tag,
            }
        }

        fn reset(&mut self, handle: &mut Dot, tag: &&'static str) {
            handle.color = *tag;
        }

        fn key(&self, handle: &Dot) -> u32 {
            handle.id
        }

        fn destroy(&mut self, handle: Dot) {
            self.destroyed.borrow_mut().push(handle.id);
        }
    }

    fn pool(capacity: usize) -> (IndicatorPool<Dots>, Scheduler, Rc<RefCell<Vec<u32>>>) {
        let dots = Dots::default();
        let destroyed = dots.destroyed.clone();
        let scheduler = Scheduler::new();
        let config = PoolConfig {
            capacity,
            ..PoolConfig::default()
        };
        (IndicatorPool::new(dots, scheduler.clone(), config), scheduler, destroyed)
    }

    #[test]
    fn free_list_is_lifo() {
        let (pool, _s, _d) = pool(10);
        let a = pool.acquire(&"red").unwrap();
        let b = pool.acquire(&"red").unwrap();
        assert!(pool.release(&a));
        assert!(pool.release(&b));
        assert_eq!(pool.acquire(&"blue"), Some(b));
        assert_eq!(pool.acquire(&"blue"), Some(a));
        let stats = pool.stats();
        assert_eq!((stats.created, stats.reused, stats.pooled), (2, 2, 2));
    }

    #[test]
    fn capacity_bounds_only_the_free_list() {
        let (pool, _s, destroyed) = pool(3);
        let keys: Vec<u32> = (0..5).map(|_| pool.acquire(&"red").unwrap()).collect();
        assert_eq!(pool.active_len(), 5);
        for k in &keys {
            assert!(pool.release(k));
        }
        assert_eq!(pool.active_len(), 0);
        assert_eq!(pool.free_len(), 3);
        assert_eq!(*destroyed.borrow(), vec![4, 5]);
        assert_eq!(pool.stats().destroyed, 2);
    }

    #[test]
    fn idle_countdown_empties_free_list_but_spares_active() {
        let (pool, scheduler, destroyed) = pool(10);
        let a = pool.acquire(&"red").unwrap();
        let b = pool.acquire(&"red").unwrap();
        pool.release(&a);
        scheduler.advance(Duration::from_millis(19_999));
        assert_eq!(pool.free_len(), 1);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(pool.free_len(), 0);
        assert_eq!(pool.active_len(), 1);
        assert_eq!(*destroyed.borrow(), vec![a]);
        assert_eq!(pool.stats().evictions, 1);
        assert!(!pool.is_countdown_pending());
        assert!(pool.release(&b));
        assert_eq!(pool.free_len(), 1);
    }

    #[test]
    fn acquire_restarts_the_countdown() {
        let (pool, scheduler, _d) = pool(10);
        let a = pool.acquire(&"red").unwrap();
        pool.release(&a);
        scheduler.advance(Duration::from_millis(19_000));
        let b = pool.acquire(&"red").unwrap();
        pool.release(&b);
        assert_eq!(scheduler.pending(), 1);
        scheduler.advance(Duration::from_millis(1_000));
        assert_eq!(pool.free_len(), 1);
        scheduler.advance(Duration::from_millis(19_000));
        assert_eq!(pool.free_len(), 0);
    }

    #[test]
    fn touch_restarts_and_hold_keeps_the_free_list() {
        let (pool, scheduler, destroyed) = pool(10);
        let a = pool.acquire(&"red").unwrap();
        pool.release(&a);
        scheduler.advance(Duration::from_secs(15));
        pool.touch();
        scheduler.advance(Duration::from_secs(15));
        assert_eq!(pool.free_len(), 1);

        pool.hold_eviction(true);
        scheduler.advance(Duration::from_secs(5));
        assert_eq!(pool.free_len(), 1);
        assert!(!pool.is_countdown_pending());
        assert_eq!(pool.stats().evictions, 0);

        pool.hold_eviction(false);
        pool.touch();
        scheduler.advance(Duration::from_secs(20));
        assert_eq!(pool.free_len(), 0);
        assert_eq!(*destroyed.borrow(), vec![a]);
    }

    #[test]
    fn reset_applies_the_new_tag() {
        let (pool, _s, _d) = pool(10);
        let a = pool.acquire(&"red").unwrap();
        pool.release(&a);
        assert_eq!(pool.acquire(&"green"), Some(a));
        let st = pool.inner.state.borrow();
        assert_eq!(st.active[&a].color, "green");
    }

    #[test]
    fn unknown_key_is_tolerated() {
        let (pool, _s, _d) = pool(10);
        assert!(!pool.release(&42));
        let a = pool.acquire(&"red").unwrap();
        assert!(pool.release(&a));
        assert!(!pool.release(&a));
    }

    #[test]
    fn clear_all_destroys_everything_and_cancels_countdown() {
        let (pool, scheduler, destroyed) = pool(10);
        let a = pool.acquire(&"red").unwrap();
        let _b = pool.acquire(&"red").unwrap();
        pool.release(&a);
        pool.clear_all();
        assert_eq!((pool.active_len(), pool.free_len()), (0, 0));
        assert_eq!(destroyed.borrow().len(), 2);
        assert_eq!(scheduler.pending(), 0);
        assert!(pool.acquire(&"red").is_some());
    }

    #[test]
    fn destroy_is_idempotent_and_final() {
        let (pool, scheduler, destroyed) = pool(10);
        let a = pool.acquire(&"red").unwrap();
        pool.destroy();
        pool.destroy();
        assert!(pool.is_destroyed());
        assert_eq!(*destroyed.borrow(), vec![a]);
        assert_eq!(pool.acquire(&"red"), None);
        assert!(!pool.release(&a));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn dropping_the_last_handle_destroys_everything() {
        let (pool, scheduler, destroyed) = pool(10);
        let a = pool.acquire(&"red").unwrap();
        let _b = pool.acquire(&"red").unwrap();
        pool.release(&a);
        drop(pool);
        assert_eq!(destroyed.borrow().len(), 2);
        assert_eq!(scheduler.pending(), 0);
    }
}
