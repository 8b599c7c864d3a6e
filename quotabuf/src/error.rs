use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuotaBufError {
    #[error("quota must be at least one unit")]
    ZeroQuota,

    #[error("capacity must be at least one slot")]
    ZeroCapacity,

    #[error("at least one producer is required")]
    NoProducers,

    #[error("at least one consumer is required")]
    NoConsumers,

    #[error("failed to allocate {0} entries")]
    Allocation(usize),

    #[error("buffer was aborted")]
    Aborted,
}
