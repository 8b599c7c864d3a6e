//! The shared bounded buffer: a circular queue of [`Unit`]s plus the
//! production and consumption ledgers and per-worker tallies, all behind one
//! lock with two wait conditions.
//!
//! Producers go through two steps. [`BoundedBuffer::reserve_slot`] claims the
//! next sequence id in a single critical section, so exactly `quota` ids are
//! ever handed out no matter how many producers race for the last one.
//! [`BoundedBuffer::enqueue`] later commits the reserved unit, waiting while
//! the buffer is full or while an earlier reservation is still uncommitted.
//! Admission therefore follows reservation order and removal order is the
//! sequence id order.
//!
//! Consumers call [`BoundedBuffer::dequeue`] until it returns `None`, which
//! happens only when the buffer is empty and nothing more can arrive: either
//! the whole quota has been consumed, or production was marked finished and
//! every reservation has been committed.
//!
//! [`BoundedBuffer::abort`] tears the protocol down when a worker dies:
//! every waiter wakes, reservations are refused, commits fail and consumers
//! stop.

use crate::ring::Ring;
use crate::sync::{Condvar, Mutex};
use crate::{Delivery, QuotaBufError, Reservation, Unit};

/// Sizes fixed for the lifetime of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Total number of units that will ever be produced (`N`).
    pub quota: u64,
    /// Number of slots (`S`).
    pub capacity: usize,
    /// Number of producers whose tallies are kept (`M`).
    pub producers: usize,
    /// Number of consumers whose tallies are kept (`P`).
    pub consumers: usize,
}

/// Point-in-time copy of the ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub quota: u64,
    pub capacity: usize,
    pub reserved: u64,
    pub committed: u64,
    pub consumed: u64,
    pub occupied: usize,
    /// Highest occupancy observed since creation.
    pub peak_occupied: usize,
    pub finished: bool,
    pub aborted: bool,
}

/// Per-worker counts, indexed by producer and consumer index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tallies {
    pub made: Vec<u64>,
    pub packed: Vec<u64>,
}

impl Tallies {
    pub fn total_made(&self) -> u64 {
        self.made.iter().sum()
    }

    pub fn total_packed(&self) -> u64 {
        self.packed.iter().sum()
    }
}

struct State {
    ring: Ring<Unit>,
    reserved: u64,
    committed: u64,
    consumed: u64,
    finished: bool,
    aborted: bool,
    peak_occupied: usize,
    made: Vec<u64>,
    packed: Vec<u64>,
}

impl State {
    /// Nothing buffered and nothing more can ever be committed.
    fn drained(&self, quota: u64) -> bool {
        self.ring.is_empty()
            && (self.consumed == quota || (self.finished && self.committed == self.reserved))
    }
}

pub struct BoundedBuffer {
    quota: u64,
    state: Mutex<State>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl BoundedBuffer {
    pub fn new(config: BufferConfig) -> Result<Self, QuotaBufError> {
        if config.quota == 0 {
            return Err(QuotaBufError::ZeroQuota);
        }
        if config.producers == 0 {
            return Err(QuotaBufError::NoProducers);
        }
        if config.consumers == 0 {
            return Err(QuotaBufError::NoConsumers);
        }

        let ring = Ring::with_capacity(config.capacity)?;
        let made = zeroed_tally(config.producers)?;
        let packed = zeroed_tally(config.consumers)?;

        Ok(BoundedBuffer {
            quota: config.quota,
            state: Mutex::new(State {
                ring,
                reserved: 0,
                committed: 0,
                consumed: 0,
                finished: false,
                aborted: false,
                peak_occupied: 0,
                made,
                packed,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }

    /// Claims the next sequence id for `producer`.
    ///
    /// Returns `None` once the quota is exhausted or production has been
    /// marked finished or aborted; a producer treats that as its stop
    /// signal. Never blocks on buffer occupancy.
    pub fn reserve_slot(&self, producer: usize) -> Option<Reservation<'_>> {
        let mut state = self.state.lock();
        debug_assert!(producer < state.made.len(), "unknown producer {producer}");

        if state.finished || state.aborted || state.reserved == self.quota {
            quotabuf_trace!(producer, reserved = state.reserved, "reservation refused");
            return None;
        }

        state.reserved += 1;
        quotabuf_trace!(producer, sequence_id = state.reserved, "slot reserved");
        Some(Reservation::new(self, state.reserved, producer))
    }

    /// Commits a reserved unit into the buffer.
    ///
    /// Blocks while the buffer is full or while a unit with a smaller
    /// sequence id is still uncommitted. Fails with
    /// [`QuotaBufError::Aborted`] if the buffer is aborted first; the unit
    /// is then discarded.
    pub fn enqueue(&self, reservation: Reservation<'_>) -> Result<Unit, QuotaBufError> {
        debug_assert!(reservation.belongs_to(self), "reservation from another buffer");
        let unit = reservation.into_unit();
        let mut state = self.state.lock();

        while !state.aborted
            && (state.ring.is_full() || state.committed + 1 != unit.sequence_id)
        {
            state = self.not_full.wait(state);
        }
        if state.aborted {
            quotabuf_trace!(sequence_id = unit.sequence_id, "commit refused, buffer aborted");
            return Err(QuotaBufError::Aborted);
        }

        state.ring.push(unit);
        state.committed += 1;
        state.made[unit.producer] += 1;
        state.peak_occupied = state.peak_occupied.max(state.ring.len());
        debug_assert!(state.committed <= state.reserved);

        quotabuf_trace!(
            sequence_id = unit.sequence_id,
            producer = unit.producer,
            occupied = state.ring.len(),
            "unit committed"
        );

        if state.finished && state.committed == state.reserved {
            self.not_empty.notify_all();
        } else {
            self.not_empty.notify_one();
        }
        // Producers also wait for their admission turn, so every one of
        // them has to re-check.
        self.not_full.notify_all();

        Ok(unit)
    }

    /// Removes the oldest unit on behalf of `consumer`.
    ///
    /// Blocks while the buffer is empty and more units may still arrive.
    /// Returns `None` once the buffer is drained for good or aborted.
    pub fn dequeue(&self, consumer: usize) -> Option<Delivery> {
        let mut state = self.state.lock();
        debug_assert!(consumer < state.packed.len(), "unknown consumer {consumer}");

        let unit = loop {
            if state.aborted {
                return None;
            }
            if let Some(unit) = state.ring.pop() {
                break unit;
            }
            if state.drained(self.quota) {
                quotabuf_trace!(consumer, consumed = state.consumed, "buffer drained");
                return None;
            }
            state = self.not_empty.wait(state);
        };

        state.consumed += 1;
        state.packed[consumer] += 1;
        debug_assert!(state.consumed <= state.committed);
        let ordinal = state.consumed;

        quotabuf_trace!(
            consumer,
            sequence_id = unit.sequence_id,
            occupied = state.ring.len(),
            "unit removed"
        );

        if state.consumed == self.quota {
            self.not_empty.notify_all();
        }
        self.not_full.notify_all();

        Some(Delivery { unit, ordinal })
    }

    /// Flags the end of production and wakes every waiting consumer.
    ///
    /// Returns `false` if production had already been marked finished.
    pub fn mark_production_finished(&self) -> bool {
        let mut state = self.state.lock();
        if state.finished {
            return false;
        }

        state.finished = true;
        quotabuf_trace!(
            reserved = state.reserved,
            committed = state.committed,
            "production finished"
        );
        self.not_empty.notify_all();
        true
    }

    /// Stops the line for good and wakes every waiter.
    ///
    /// Returns `false` if the buffer was already aborted.
    pub fn abort(&self) -> bool {
        let mut state = self.state.lock();
        if state.aborted {
            return false;
        }

        state.aborted = true;
        quotabuf_trace!(
            reserved = state.reserved,
            committed = state.committed,
            consumed = state.consumed,
            "buffer aborted"
        );
        self.not_full.notify_all();
        self.not_empty.notify_all();
        true
    }

    /// Returns a guard that aborts the buffer if the current thread unwinds
    /// while holding it.
    pub fn abort_on_panic(&self) -> AbortOnPanic<'_> {
        AbortOnPanic { buffer: self }
    }

    pub fn stats(&self) -> BufferStats {
        let state = self.state.lock();
        BufferStats {
            quota: self.quota,
            capacity: state.ring.capacity(),
            reserved: state.reserved,
            committed: state.committed,
            consumed: state.consumed,
            occupied: state.ring.len(),
            peak_occupied: state.peak_occupied,
            finished: state.finished,
            aborted: state.aborted,
        }
    }

    pub fn tallies(&self) -> Tallies {
        let state = self.state.lock();
        Tallies {
            made: state.made.clone(),
            packed: state.packed.clone(),
        }
    }
}

/// See [`BoundedBuffer::abort_on_panic`].
#[must_use = "the guard only acts while it is alive"]
pub struct AbortOnPanic<'a> {
    buffer: &'a BoundedBuffer,
}

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.buffer.abort();
        }
    }
}

fn zeroed_tally(len: usize) -> Result<Vec<u64>, QuotaBufError> {
    let mut tally = Vec::new();
    tally
        .try_reserve_exact(len)
        .map_err(|_| QuotaBufError::Allocation(len))?;
    tally.resize(len, 0);
    Ok(tally)
}
