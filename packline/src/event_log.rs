//! Line-oriented audit log of every unit that passes through the line.
//!
//! The log has its own lock and is never touched while the buffer lock is
//! held. A unit's `puts` line always lands before its `gets` line: a packer
//! that dequeues a unit before its maker got to log it parks on the log
//! until the `puts` line is written.

use parking_lot::{Condvar, Mutex};
use quotabuf::{Tallies, Unit};
use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};
use tracing::warn;

use crate::RunParams;

pub const SEPARATOR: &str = "-----";

struct Sink<W> {
    writer: W,
    lines: u64,
    error: Option<io::Error>,
    /// Units whose `puts` line is out and whose `gets` line is not.
    produced: HashSet<u64>,
}

impl<W: Write> Sink<W> {
    /// Writes and flushes one line. After the first failure every later line
    /// is dropped; workers keep running so neither pool is stranded.
    fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.error.is_some() {
            return;
        }

        let result = self
            .writer
            .write_fmt(args)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());

        match result {
            Ok(()) => self.lines += 1,
            Err(e) => {
                warn!(
                    error = %e,
                    line = self.lines + 1,
                    "event log write failed, dropping further lines"
                );
                self.error = Some(e);
            }
        }
    }
}

pub struct EventLog<W> {
    sink: Mutex<Sink<W>>,
    puts_written: Condvar,
}

impl<W: Write> EventLog<W> {
    pub fn new(writer: W) -> Self {
        EventLog {
            sink: Mutex::new(Sink {
                writer,
                lines: 0,
                error: None,
                produced: HashSet::new(),
            }),
            puts_written: Condvar::new(),
        }
    }

    pub fn header(&self, params: &RunParams) {
        let mut sink = self.sink.lock();
        sink.line(format_args!("order:{}", params.order));
        sink.line(format_args!("capacity:{}", params.capacity));
        sink.line(format_args!("making machines:{}", params.makers));
        sink.line(format_args!("packing machines:{}", params.packers));
        sink.line(format_args!("{SEPARATOR}"));
    }

    pub fn produced(&self, unit: &Unit) {
        let mut sink = self.sink.lock();
        sink.line(format_args!(
            "m{} puts {}",
            unit.producer + 1,
            unit.sequence_id
        ));
        // Recorded even if the line was dropped, so packers never wait on it.
        sink.produced.insert(unit.sequence_id);
        drop(sink);
        self.puts_written.notify_all();
    }

    /// Writes the `gets` line, first waiting for the unit's `puts` line.
    pub fn consumed(&self, packer: usize, unit: &Unit) {
        let mut sink = self.sink.lock();
        while !sink.produced.remove(&unit.sequence_id) {
            self.puts_written.wait(&mut sink);
        }
        sink.line(format_args!(
            "p{} gets {} from m{}",
            packer + 1,
            unit.sequence_id,
            unit.producer + 1
        ));
    }

    pub fn summary(&self, tallies: &Tallies) {
        let mut sink = self.sink.lock();
        sink.line(format_args!("{SEPARATOR}"));
        sink.line(format_args!("summary:"));
        for (index, made) in tallies.made.iter().enumerate() {
            sink.line(format_args!("m{} made {}", index + 1, made));
        }
        for (index, packed) in tallies.packed.iter().enumerate() {
            sink.line(format_args!("p{} packed {}", index + 1, packed));
        }
    }

    /// Reports the first write failure, if any, without clearing it.
    pub fn check(&self) -> io::Result<()> {
        match &self.sink.lock().error {
            Some(e) => Err(io::Error::new(e.kind(), e.to_string())),
            None => Ok(()),
        }
    }

    /// Returns the writer, or the first write failure seen during the run.
    pub fn into_inner(self) -> io::Result<W> {
        let sink = self.sink.into_inner();
        match sink.error {
            Some(e) => Err(e),
            None => Ok(sink.writer),
        }
    }
}
