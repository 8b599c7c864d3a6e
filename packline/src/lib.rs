use quotabuf::QuotaBufError;
use std::fmt;
use thiserror::Error;

pub mod config;
pub mod event_log;
pub mod maker;
pub mod packer;
pub mod run;
pub mod work;

pub use config::Config;
pub use event_log::EventLog;
pub use run::{Coordinator, RunParams, RunReport, RunState, MAX_PACKERS};
pub use work::{Idle, Phase, Sleep, Spin, Work, WorkConfig};

/// Which pool a worker thread belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Maker,
    Packer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Maker => f.write_str("maker"),
            Role::Packer => f.write_str("packer"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PacklineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("buffer error: {0}")]
    Buffer(#[from] QuotaBufError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to spawn {role} thread {number}: {source}")]
    Spawn {
        role: Role,
        number: usize,
        source: std::io::Error,
    },
    #[error("{role} thread {number} panicked")]
    WorkerPanicked { role: Role, number: usize },
}

pub type Result<T> = std::result::Result<T, PacklineError>;
