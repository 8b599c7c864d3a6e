use quotabuf::BoundedBuffer;
use std::io::Write;
use tracing::{debug, trace};

use crate::{EventLog, Phase, Work};

/// Production loop for the maker with 0-based `index`.
///
/// Builds, reserves, sends and commits units until the buffer refuses a
/// reservation or a commit. The build phase comes first, so a maker may
/// finish a build it never gets to reserve. The `puts` line is written after
/// the commit, outside the buffer lock. Returns the number of units this
/// maker committed.
///
/// A panic anywhere in the loop aborts the buffer so no other worker is
/// left waiting on this one.
pub fn run_maker<W, K>(index: usize, buffer: &BoundedBuffer, log: &EventLog<W>, work: &K) -> u64
where
    W: Write,
    K: Work + ?Sized,
{
    let _abort = buffer.abort_on_panic();
    let mut made = 0;

    loop {
        work.perform(Phase::Build);

        let Some(reservation) = buffer.reserve_slot(index) else {
            break;
        };

        trace!(maker = index + 1, sequence_id = reservation.sequence_id(), "slot reserved");

        work.perform(Phase::Send);

        let unit = match buffer.enqueue(reservation) {
            Ok(unit) => unit,
            Err(e) => {
                debug!(maker = index + 1, error = %e, "commit refused");
                break;
            }
        };
        log.produced(&unit);
        made += 1;

        trace!(maker = index + 1, sequence_id = unit.sequence_id, "unit made");
    }

    debug!(maker = index + 1, made, "maker stopped");
    made
}
