//! Boundary to the task scheduler that runs index jobs.

use thiserror::Error;

use super::types::SearchTask;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Task rejected: {0}")]
    Rejected(String),

    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),
}

/// Accepts tasks for later execution.
///
/// Implementations run each task at most once at a time and hand it to an
/// [`IndexJobExecutor`](super::executor::IndexJobExecutor), re-delivering it
/// while the executor reports failure.
pub trait TaskScheduler: Send + Sync {
    fn submit(&self, task: SearchTask) -> Result<(), SchedulerError>;
}
