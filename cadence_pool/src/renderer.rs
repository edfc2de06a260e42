// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rendering collaborator.

use core::fmt::Debug;
use core::hash::Hash;

/// Creates, recycles, and disposes of the visual handles a pool manages.
///
/// The pool never inspects handles; it only moves them between its active map
/// and its free list. Implementations must not call back into the pool from
/// these methods.
pub trait IndicatorRenderer {
    /// A rendered indicator (a view, a sprite, a DOM node).
    type Handle;
    /// Identity of a rendered indicator, as reported by its lifecycle-ended signal.
    type Key: Clone + Eq + Hash + Debug;
    /// Visual parameters applied on creation and reuse (color, label).
    type Tag;

    /// Build a new handle showing `tag`.
    fn create(&mut self, tag: &Self::Tag) -> Self::Handle;

    /// Prepare a recycled handle to show `tag` again.
    fn reset(&mut self, handle: &mut Self::Handle, tag: &Self::Tag);

    /// Identity of `handle`. Must stay stable while the handle is active.
    fn key(&self, handle: &Self::Handle) -> Self::Key;

    /// Release everything `handle` holds.
    fn destroy(&mut self, handle: Self::Handle);
}
