// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The object pool: a single `Vec` of slots addressed by [`Handle`], with a
//! free list recycling slots the collector reclaims.
//!
//! Grounded on the teacher's process-heap allocator (`value/heap.rs`,
//! `runtime/allocator.rs`): fixed-size records in a preallocated arena with
//! a free list, generalized here to an owned, growable `HeapObject` per
//! slot since there is no seL4 frame budget to respect.

pub mod gc;

use crate::error::{LonaError, Result};
use crate::handle::Handle;
use crate::value::object::HeapObject;
use tracing::trace;

struct Slot {
    object: Option<HeapObject>,
    marked: bool,
}

/// The VM's object pool.
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Total successful allocations, for diagnostics and the `(gc-stats)` primitive.
    pub allocations: u64,
    /// Total objects reclaimed across all collections.
    pub reclaimed: u64,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            allocations: 0,
            reclaimed: 0,
        }
    }

    /// Allocate a new object, reusing a freed slot if one is available.
    pub fn alloc(&mut self, object: HeapObject) -> Handle {
        self.allocations += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            slot.marked = false;
            trace!(index, "reused heap slot");
            Handle::new(index)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                object: Some(object),
                marked: false,
            });
            trace!(index, "grew heap pool");
            Handle::new(index)
        }
    }

    /// Borrow an object by handle.
    ///
    /// # Errors
    /// Returns `Err` if the handle addresses a freed slot (an internal
    /// invariant violation: all live handles are reachable from roots).
    pub fn get(&self, handle: Handle) -> Result<&HeapObject> {
        self.slots
            .get(handle.index())
            .and_then(|s| s.object.as_ref())
            .ok_or_else(|| LonaError::internal(format!("dangling handle {handle:?}")))
    }

    /// Mutably borrow an object by handle.
    ///
    /// # Errors
    /// Returns `Err` if the handle addresses a freed slot.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut HeapObject> {
        self.slots
            .get_mut(handle.index())
            .and_then(|s| s.object.as_mut())
            .ok_or_else(|| LonaError::internal(format!("dangling handle {handle:?}")))
    }

    /// Mutably borrow two distinct objects at once, e.g. a `Port` and the
    /// `Stream` it wraps. Errors if the handles are equal (aliasing) or
    /// either is dangling.
    pub fn get_two_mut(&mut self, a: Handle, b: Handle) -> Result<(&mut HeapObject, &mut HeapObject)> {
        if a.index() == b.index() {
            return Err(LonaError::internal("get_two_mut called with the same handle twice"));
        }
        let (lo, hi, swapped) = if a.index() < b.index() { (a, b, false) } else { (b, a, true) };
        let (left, right) = self.slots.split_at_mut(hi.index());
        let lo_obj = left
            .get_mut(lo.index())
            .and_then(|s| s.object.as_mut())
            .ok_or_else(|| LonaError::internal(format!("dangling handle {lo:?}")))?;
        let hi_obj = right
            .first_mut()
            .and_then(|s| s.object.as_mut())
            .ok_or_else(|| LonaError::internal(format!("dangling handle {hi:?}")))?;
        if swapped {
            Ok((hi_obj, lo_obj))
        } else {
            Ok((lo_obj, hi_obj))
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
