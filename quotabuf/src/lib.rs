//! # quotabuf - Bounded Buffer with an Exact Production Quota
//!
//! A fixed-capacity circular buffer shared by a pool of producers and a pool
//! of consumers that together move exactly `quota` units. One lock covers
//! the slots, the production and consumption ledgers and the per-worker
//! tallies; two condition variables park producers while the buffer is full
//! and consumers while it is empty.
//!
//! ## Creating a Buffer
//!
//! ```rust
//! use quotabuf::{BoundedBuffer, BufferConfig};
//!
//! let buffer = BoundedBuffer::new(BufferConfig {
//!     quota: 5,
//!     capacity: 2,
//!     producers: 1,
//!     consumers: 1,
//! })?;
//! # Ok::<(), quotabuf::QuotaBufError>(())
//! ```
//!
//! ## Producing
//!
//! A producer first reserves a sequence id, then commits the unit. The
//! reservation step never blocks and returns `None` once the quota is used
//! up; the commit step waits for room.
//!
//! ```rust
//! # use quotabuf::{BoundedBuffer, BufferConfig};
//! # let buffer = BoundedBuffer::new(BufferConfig { quota: 5, capacity: 8, producers: 1, consumers: 1 })?;
//! while let Some(reservation) = buffer.reserve_slot(0) {
//!     let unit = buffer.enqueue(reservation)?;
//!     assert_eq!(unit.producer, 0);
//! }
//! assert_eq!(buffer.stats().committed, 5);
//! # Ok::<(), quotabuf::QuotaBufError>(())
//! ```
//!
//! ## Consuming
//!
//! ```rust
//! # use quotabuf::{BoundedBuffer, BufferConfig};
//! # let buffer = BoundedBuffer::new(BufferConfig { quota: 2, capacity: 2, producers: 1, consumers: 1 })?;
//! # while let Some(r) = buffer.reserve_slot(0) { buffer.enqueue(r)?; }
//! buffer.mark_production_finished();
//! while let Some(delivery) = buffer.dequeue(0) {
//!     println!("unit {} from producer {}", delivery.unit.sequence_id, delivery.unit.producer);
//! }
//! assert_eq!(buffer.tallies().total_packed(), 2);
//! # Ok::<(), quotabuf::QuotaBufError>(())
//! ```
//!
//! ## Termination
//!
//! `dequeue` returns `None` only when the buffer is empty and nothing more
//! can arrive: the whole quota was consumed, or
//! [`BoundedBuffer::mark_production_finished`] was called and every
//! reservation has been committed. Marking production finished wakes every
//! parked consumer so each one re-evaluates that condition.
//!
//! ## Aborting
//!
//! A worker that dies mid-protocol would strand the others: producers
//! waiting for room or for their admission turn, consumers waiting for units
//! that never come. [`BoundedBuffer::abort`] wakes everyone and makes every
//! later call fail fast. It runs automatically when a [`Reservation`] is
//! dropped without being committed, and when a thread unwinds while holding
//! the guard from [`BoundedBuffer::abort_on_panic`].
//!
//! ```rust
//! # use quotabuf::{BoundedBuffer, BufferConfig, QuotaBufError};
//! # let buffer = BoundedBuffer::new(BufferConfig { quota: 5, capacity: 2, producers: 1, consumers: 1 })?;
//! let first = buffer.reserve_slot(0).unwrap();
//! let second = buffer.reserve_slot(0).unwrap();
//! drop(first);
//! assert_eq!(buffer.enqueue(second), Err(QuotaBufError::Aborted));
//! assert!(buffer.dequeue(0).is_none());
//! # Ok::<(), quotabuf::QuotaBufError>(())
//! ```

#[macro_use]
mod trace_macro;

pub use buffer::{AbortOnPanic, BoundedBuffer, BufferConfig, BufferStats, Tallies};
pub use error::QuotaBufError;
pub use unit::{Delivery, Reservation, Unit};

pub(crate) mod buffer;
pub mod error;
#[cfg(all(test, feature = "loom"))]
pub(crate) mod loom;
pub(crate) mod ring;
pub(crate) mod sync;
pub(crate) mod unit;
