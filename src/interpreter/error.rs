use thiserror::Error;

/// Host-level faults. Script errors are thrown values carried by
/// [`Completion::Throw`](super::Completion::Throw) instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("job limit of {limit} exceeded with {pending} jobs still queued")]
    JobLimitExceeded { limit: usize, pending: usize },
    #[error("uncaught exception: {0}")]
    Uncaught(String),
}
