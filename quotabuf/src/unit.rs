use std::{fmt, mem};

use crate::BoundedBuffer;

/// A produced item.
///
/// `sequence_id` runs from 1 to the buffer's quota and is assigned exactly
/// once; `producer` is the 0-based index of the producer that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unit {
    pub sequence_id: u64,
    pub producer: usize,
}

/// A claimed sequence id that has not been committed to the buffer yet.
///
/// Only [`BoundedBuffer::reserve_slot`] creates one and
/// [`BoundedBuffer::enqueue`] consumes it, so every committed id was reserved
/// and no id is committed twice. Dropping a reservation instead of
/// committing it leaves a hole that later ids would wait on forever, so the
/// drop aborts the buffer.
#[must_use = "a reservation must be committed with `BoundedBuffer::enqueue`"]
pub struct Reservation<'a> {
    buffer: &'a BoundedBuffer,
    sequence_id: u64,
    producer: usize,
}

impl<'a> Reservation<'a> {
    pub(crate) fn new(buffer: &'a BoundedBuffer, sequence_id: u64, producer: usize) -> Self {
        Reservation {
            buffer,
            sequence_id,
            producer,
        }
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub(crate) fn belongs_to(&self, buffer: &BoundedBuffer) -> bool {
        std::ptr::eq(self.buffer, buffer)
    }

    pub(crate) fn into_unit(self) -> Unit {
        let unit = Unit {
            sequence_id: self.sequence_id,
            producer: self.producer,
        };
        mem::forget(self);
        unit
    }
}

impl fmt::Debug for Reservation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("sequence_id", &self.sequence_id)
            .field("producer", &self.producer)
            .finish_non_exhaustive()
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        quotabuf_trace!(sequence_id = self.sequence_id, "reservation dropped uncommitted");
        self.buffer.abort();
    }
}

/// A unit handed to a consumer, with its position in the global dequeue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub unit: Unit,
    /// 1-based; the n-th unit removed from the buffer has ordinal n.
    pub ordinal: u64,
}
