//! Deferred index maintenance.
//!
//! Index requests are not applied on the caller's thread. The search manager
//! wraps them in a [`SearchTask`] and hands it to a [`TaskScheduler`], which
//! later runs the job through an [`IndexJobExecutor`]. [`JobQueue`] is the
//! file-backed scheduler used by the command line.

pub mod executor;
pub mod queue;
pub mod scheduler;
pub mod types;

pub use executor::{
    CancellationToken, CompletedItem, CompletionSink, IndexJobExecutor, JobReport, ProgressCallback,
};
pub use queue::{DEFAULT_MAX_RETRIES, JobQueue, QueueError, QueueRunStats, QueuedTask};
pub use scheduler::{SchedulerError, TaskScheduler};
pub use types::{
    IndexAction, IndexJob, MAJOR_PRIORITY, MINOR_PRIORITY_INDEX, MINOR_PRIORITY_REMOVE,
    SearchTask, TASK_TYPE,
};
