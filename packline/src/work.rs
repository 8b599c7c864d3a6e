//! Opaque timed work phases.
//!
//! Makers and packers spend time outside the buffer lock building, sending
//! and finishing units. That time carries no logic of its own; it only
//! widens the windows in which workers race. The cost model is injected so
//! tests can run with no delay at all.

use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::time::Duration;

/// The phases a unit goes through outside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Maker builds the next unit, before reserving it.
    Build,
    /// Maker carries a reserved unit to the buffer.
    Send,
    /// Packer takes and packs a removed unit.
    Finish,
}

impl Phase {
    /// Relative cost in work units.
    pub const fn units(self) -> u32 {
        match self {
            Phase::Build => 4,
            Phase::Send => 1,
            Phase::Finish => 3,
        }
    }
}

pub trait Work: Sync {
    fn perform(&self, phase: Phase);
}

impl<F> Work for F
where
    F: Fn(Phase) + Sync,
{
    fn perform(&self, phase: Phase) {
        self(phase)
    }
}

/// No delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Idle;

impl Work for Idle {
    fn perform(&self, _phase: Phase) {}
}

/// Busy loop of `iterations` decrements per work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spin {
    pub iterations: u64,
}

impl Work for Spin {
    fn perform(&self, phase: Phase) {
        for _ in 0..phase.units() {
            let mut remaining = black_box(self.iterations);
            while remaining > 0 {
                remaining = black_box(remaining - 1);
            }
        }
    }
}

/// Parks the thread for `per_unit` per work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sleep {
    pub per_unit: Duration,
}

impl Work for Sleep {
    fn perform(&self, phase: Phase) {
        std::thread::sleep(self.per_unit * phase.units());
    }
}

pub const DEFAULT_SPIN_ITERATIONS: u64 = 300_000_000;
pub const DEFAULT_SLEEP_PER_UNIT: Duration = Duration::from_millis(10);

/// Work model as selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkConfig {
    #[serde(rename = "none")]
    Idle,
    Spin {
        #[serde(default = "default_spin_iterations")]
        iterations: u64,
    },
    Sleep {
        #[serde(default = "default_sleep_per_unit", with = "humantime_duration")]
        per_unit: Duration,
    },
}

impl Default for WorkConfig {
    fn default() -> Self {
        WorkConfig::Spin {
            iterations: DEFAULT_SPIN_ITERATIONS,
        }
    }
}

impl Work for WorkConfig {
    fn perform(&self, phase: Phase) {
        match *self {
            WorkConfig::Idle => Idle.perform(phase),
            WorkConfig::Spin { iterations } => Spin { iterations }.perform(phase),
            WorkConfig::Sleep { per_unit } => Sleep { per_unit }.perform(phase),
        }
    }
}

fn default_spin_iterations() -> u64 {
    DEFAULT_SPIN_ITERATIONS
}

fn default_sleep_per_unit() -> Duration {
    DEFAULT_SLEEP_PER_UNIT
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
