//! Fixed-size circular slot array backing the bounded buffer.
//!
//! `Ring` does no synchronization of its own; every access goes through the
//! buffer's lock. `head` is the next slot to remove from, `tail` the next slot
//! to write to, and both always index valid slots modulo the capacity.

use crate::QuotaBufError;

#[derive(Debug)]
pub(crate) struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> Ring<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self, QuotaBufError> {
        if capacity == 0 {
            return Err(QuotaBufError::ZeroCapacity);
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| QuotaBufError::Allocation(capacity))?;
        slots.resize_with(capacity, || None);

        Ok(Ring {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Writes `value` at the tail. The caller must have checked `is_full`.
    pub(crate) fn push(&mut self, value: T) {
        debug_assert!(!self.is_full(), "push into a full ring");

        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.slots.len();
        self.len += 1;
    }

    /// Removes the oldest value, or `None` when empty.
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let value = self.slots[self.head].take();
        debug_assert!(value.is_some(), "occupied slot was empty");
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        value
    }
}
