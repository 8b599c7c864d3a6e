//! Run Coordinator: owns the buffer and the log for one run and drives both
//! worker pools through `Starting -> Producing -> Draining -> Done`.
//!
//! Makers and packers start together, so production and draining overlap
//! for the workers. The phases only describe what the coordinator is
//! waiting on: first every maker, then, once production is marked finished,
//! every packer.

use parking_lot::{Condvar, Mutex};
use quotabuf::{BoundedBuffer, BufferConfig, BufferStats, Tallies};
use std::io::Write;
use std::thread::{self, Scope, ScopedJoinHandle};
use tracing::{debug, info, warn};

use crate::maker::run_maker;
use crate::packer::run_packer;
use crate::{EventLog, PacklineError, Result, Role, Work};

pub const MAX_PACKERS: usize = 30;

/// Sizes of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    /// Units to produce (`N`).
    pub order: u64,
    /// Buffer slots (`S`).
    pub capacity: usize,
    /// Making machines (`M`).
    pub makers: usize,
    /// Packing machines (`P`).
    pub packers: usize,
}

impl RunParams {
    pub fn validate(&self) -> Result<()> {
        if self.order == 0 || self.capacity == 0 || self.makers == 0 || self.packers == 0 {
            return Err(PacklineError::InvalidConfig(
                "all of order, capacity, makers and packers must be positive".to_string(),
            ));
        }
        if self.order <= self.capacity as u64 {
            return Err(PacklineError::InvalidConfig(format!(
                "order ({}) must be greater than capacity ({})",
                self.order, self.capacity
            )));
        }
        if self.packers > MAX_PACKERS {
            return Err(PacklineError::InvalidConfig(format!(
                "packers ({}) cannot exceed {}",
                self.packers, MAX_PACKERS
            )));
        }
        Ok(())
    }

    fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            quota: self.order,
            capacity: self.capacity,
            producers: self.makers,
            consumers: self.packers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Starting,
    Producing,
    Draining,
    Done,
}

fn advance(state: &mut RunState, next: RunState) {
    debug_assert!(
        matches!(
            (*state, next),
            (RunState::Starting, RunState::Producing)
                | (RunState::Producing, RunState::Draining)
                | (RunState::Draining, RunState::Done)
        ),
        "illegal run transition {state:?} -> {next:?}"
    );
    debug!(from = ?*state, to = ?next, "run state");
    *state = next;
}

pub struct RunReport<W> {
    pub params: RunParams,
    pub tallies: Tallies,
    pub stats: BufferStats,
    pub state: RunState,
    /// The log writer, handed back after the summary was written.
    pub sink: W,
}

/// Holds every worker until all threads are spawned, or tells them to leave
/// if one could not be.
struct StartGate {
    open: Mutex<Option<bool>>,
    changed: Condvar,
}

impl StartGate {
    fn new() -> Self {
        StartGate {
            open: Mutex::new(None),
            changed: Condvar::new(),
        }
    }

    fn release(&self, go: bool) {
        *self.open.lock() = Some(go);
        self.changed.notify_all();
    }

    fn wait(&self) -> bool {
        let mut open = self.open.lock();
        while open.is_none() {
            self.changed.wait(&mut open);
        }
        *open == Some(true)
    }
}

pub struct Coordinator<'k, K: ?Sized, W> {
    params: RunParams,
    work: &'k K,
    buffer: BoundedBuffer,
    log: EventLog<W>,
    state: RunState,
}

impl<'k, K, W> Coordinator<'k, K, W>
where
    K: Work + ?Sized,
    W: Write + Send,
{
    /// Allocates the buffer and writes the run header. Any failure here
    /// aborts the run before a single worker exists.
    pub fn new(params: RunParams, work: &'k K, sink: W) -> Result<Self> {
        params.validate()?;

        let buffer = BoundedBuffer::new(params.buffer_config())?;
        let log = EventLog::new(sink);
        log.header(&params);
        log.check()?;

        info!(
            order = params.order,
            capacity = params.capacity,
            makers = params.makers,
            packers = params.packers,
            "run starting"
        );

        Ok(Coordinator {
            params,
            work,
            buffer,
            log,
            state: RunState::Starting,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn run(self) -> Result<RunReport<W>> {
        let Coordinator {
            params,
            work,
            buffer,
            log,
            mut state,
        } = self;

        let gate = StartGate::new();
        let make = |index: usize| run_maker(index, &buffer, &log, work);
        let pack = |index: usize| run_packer(index, &buffer, &log, work);

        thread::scope(|s| -> Result<()> {
            let makers = spawn_pool(s, &gate, Role::Maker, params.makers, &make)?;
            let packers = spawn_pool(s, &gate, Role::Packer, params.packers, &pack)?;

            advance(&mut state, RunState::Producing);
            gate.release(true);

            let made = join_pool(Role::Maker, makers);
            buffer.mark_production_finished();
            advance(&mut state, RunState::Draining);

            let packed = join_pool(Role::Packer, packers);
            debug!(made = ?made.as_ref().ok(), packed = ?packed.as_ref().ok(), "pools joined");

            made?;
            packed?;
            Ok(())
        })?;

        let tallies = buffer.tallies();
        let stats = buffer.stats();
        log.summary(&tallies);
        advance(&mut state, RunState::Done);

        let sink = log.into_inner()?;

        info!(
            made = tallies.total_made(),
            packed = tallies.total_packed(),
            peak_occupied = stats.peak_occupied,
            "run complete"
        );

        Ok(RunReport {
            params,
            tallies,
            stats,
            state,
            sink,
        })
    }
}

fn spawn_pool<'scope, 'env, F>(
    scope: &'scope Scope<'scope, 'env>,
    gate: &'scope StartGate,
    role: Role,
    count: usize,
    body: &'scope F,
) -> Result<Vec<ScopedJoinHandle<'scope, u64>>>
where
    F: Fn(usize) -> u64 + Sync,
{
    let mut handles = Vec::with_capacity(count);

    for index in 0..count {
        let spawned = thread::Builder::new()
            .name(format!("{role}-{}", index + 1))
            .spawn_scoped(scope, move || if gate.wait() { body(index) } else { 0 });

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                warn!(%role, number = index + 1, error = %source, "failed to spawn worker");
                gate.release(false);
                return Err(PacklineError::Spawn {
                    role,
                    number: index + 1,
                    source,
                });
            }
        }
    }

    Ok(handles)
}

fn join_pool(role: Role, handles: Vec<ScopedJoinHandle<'_, u64>>) -> Result<u64> {
    let mut total = 0;
    let mut panicked = None;

    for (index, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(count) => total += count,
            Err(_) => {
                warn!(%role, number = index + 1, "worker panicked");
                panicked.get_or_insert(index + 1);
            }
        }
    }

    match panicked {
        Some(number) => Err(PacklineError::WorkerPanicked { role, number }),
        None => Ok(total),
    }
}
