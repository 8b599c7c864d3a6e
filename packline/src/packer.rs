use quotabuf::BoundedBuffer;
use std::io::Write;
use tracing::{debug, trace};

use crate::{EventLog, Phase, Work};

/// Consumption loop for the packer with 0-based `index`.
///
/// Removes, finishes and records units until the buffer is drained for
/// good or aborted. The `gets` line is written after the finish phase and
/// outside the buffer lock. Returns the number of units this packer handled.
///
/// A panic while packing aborts the buffer, releasing makers that wait for
/// room this packer would have made.
pub fn run_packer<W, K>(index: usize, buffer: &BoundedBuffer, log: &EventLog<W>, work: &K) -> u64
where
    W: Write,
    K: Work + ?Sized,
{
    let _abort = buffer.abort_on_panic();
    let mut packed = 0;

    while let Some(delivery) = buffer.dequeue(index) {
        work.perform(Phase::Finish);
        log.consumed(index, &delivery.unit);
        packed += 1;

        trace!(
            packer = index + 1,
            sequence_id = delivery.unit.sequence_id,
            maker = delivery.unit.producer + 1,
            "unit packed"
        );
    }

    debug!(packer = index + 1, packed, "packer stopped");
    packed
}
