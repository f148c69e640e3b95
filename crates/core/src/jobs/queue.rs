//! Durable local task queue.
//!
//! Tasks are kept in a single JSON file and executed in priority order by
//! [`JobQueue::run_pending`]. A failed task is retried on the next run with
//! its (already shrunk) url list until it reaches the retry limit, after which
//! it is held for inspection.
//!
//! Several handles, possibly in different processes, may share one file.
//! Every mutation re-reads the file under an exclusive lock on a sibling
//! `.lock` file, so tasks submitted through another handle are never
//! overwritten.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::executor::{CancellationToken, CompletionSink, IndexJobExecutor};
use super::scheduler::{SchedulerError, TaskScheduler};
use super::types::{SearchTask, TASK_TYPE};
use crate::descriptor::DescriptorStore;
use crate::search::IndexRegistry;

/// Default number of failed runs before a task is held.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to read queue file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse queue file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write queue file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock queue file {path}: {source}")]
    Lock {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize queue: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A task as stored in the queue file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: u64,
    pub task: SearchTask,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub held: bool,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QueueState {
    next_id: u64,
    tasks: Vec<QueuedTask>,
}

/// Summary of one [`JobQueue::run_pending`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueRunStats {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub held: usize,
    pub dropped: usize,
}

pub struct JobQueue {
    path: PathBuf,
    lock_path: PathBuf,
    max_retries: u32,
    /// Last state read from disk; served when a later read fails.
    snapshot: Mutex<QueueState>,
}

impl JobQueue {
    /// Open the queue at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path, max_retries: u32) -> Result<Self, QueueError> {
        let state = read_state(path)?;

        let mut lock_path = path.as_os_str().to_owned();
        lock_path.push(".lock");

        Ok(Self {
            path: path.to_path_buf(),
            lock_path: PathBuf::from(lock_path),
            max_retries: max_retries.max(1),
            snapshot: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.current().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All queued tasks (held ones included) in execution order.
    pub fn pending(&self) -> Vec<QueuedTask> {
        let mut tasks = self.current().tasks;
        sort_for_execution(&mut tasks);
        tasks
    }

    /// Clear the held flag and retry count of every held task.
    pub fn release_held(&self) -> Result<usize, QueueError> {
        self.update(|state| {
            let mut released = 0;
            for queued in state.tasks.iter_mut().filter(|t| t.held) {
                queued.held = false;
                queued.attempts = 0;
                released += 1;
            }
            released
        })
    }

    /// Execute every runnable task once, in priority order.
    ///
    /// No lock is held while a job runs, so tasks can be submitted
    /// concurrently; they are picked up by the next pass. A task's index is
    /// created on first use.
    pub fn run_pending(
        &self,
        registry: &IndexRegistry,
        descriptors: &DescriptorStore,
        completion: Option<Arc<dyn CompletionSink>>,
        cancel: &CancellationToken,
    ) -> Result<QueueRunStats, QueueError> {
        let batch: Vec<QueuedTask> = self.pending().into_iter().filter(|t| !t.held).collect();
        let mut stats = QueueRunStats::default();

        for mut queued in batch {
            if cancel.is_cancelled() {
                tracing::info!("Queue run cancelled");
                break;
            }

            let success = match registry.register(&queued.task.job.index_name) {
                Ok(store) => {
                    let task = queued.id;
                    let executor = IndexJobExecutor::new(store, descriptors.clone())
                        .with_completion_sink(completion.clone())
                        .with_progress(Box::new(move |done, total, reference| {
                            tracing::debug!(task, done, total, %reference, "Item processed");
                        }));
                    executor.run(&mut queued.task.job, cancel).success
                }
                Err(e) => {
                    tracing::warn!(task = queued.id, error = %e, "Cannot open index for task");
                    false
                }
            };
            stats.processed += 1;

            self.update(|state| {
                let Some(pos) = state.tasks.iter().position(|t| t.id == queued.id) else {
                    return;
                };

                if success {
                    stats.succeeded += 1;
                    state.tasks.remove(pos);
                    return;
                }

                stats.failed += 1;
                queued.attempts += 1;
                if queued.attempts < self.max_retries {
                    state.tasks[pos] = queued;
                } else if queued.task.hold_after_max_retries {
                    tracing::warn!(task = queued.id, attempts = queued.attempts, "Holding task");
                    queued.held = true;
                    stats.held += 1;
                    state.tasks[pos] = queued;
                } else {
                    tracing::warn!(task = queued.id, attempts = queued.attempts, "Dropping task");
                    stats.dropped += 1;
                    state.tasks.remove(pos);
                }
            })?;
        }

        tracing::debug!(?stats, "Queue run finished");
        Ok(stats)
    }

    fn push(&self, task: SearchTask) -> Result<u64, QueueError> {
        self.update(|state| {
            let id = state.next_id;
            state.next_id += 1;
            state.tasks.push(QueuedTask { id, task, attempts: 0, held: false, enqueued_at: Utc::now() });
            id
        })
    }

    /// Fresh state from disk, or the last good snapshot if the file cannot be read.
    fn current(&self) -> QueueState {
        let mut snapshot = self.snapshot.lock();
        match read_state(&self.path) {
            Ok(state) => *snapshot = state,
            Err(e) => tracing::error!(error = %e, "Serving cached queue state"),
        }
        snapshot.clone()
    }

    /// Apply `f` to the on-disk state while holding the file lock, then persist it.
    fn update<T>(&self, f: impl FnOnce(&mut QueueState) -> T) -> Result<T, QueueError> {
        let mut snapshot = self.snapshot.lock();
        let _lock = self.lock_file()?;

        let mut state = read_state(&self.path)?;
        let out = f(&mut state);
        self.save(&state)?;
        *snapshot = state;
        Ok(out)
    }

    /// The exclusive lock is released when the returned handle is dropped.
    fn lock_file(&self) -> Result<File, QueueError> {
        let lock_err = |source| QueueError::Lock { path: self.lock_path.display().to_string(), source };

        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(lock_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;
        Ok(file)
    }

    fn save(&self, state: &QueueState) -> Result<(), QueueError> {
        let write_err = |source| QueueError::Write { path: self.path.display().to_string(), source };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(state)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

fn read_state(path: &Path) -> Result<QueueState, QueueError> {
    if !path.exists() {
        return Ok(QueueState::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|source| QueueError::Read { path: path.display().to_string(), source })?;
    serde_json::from_str(&content)
        .map_err(|source| QueueError::Parse { path: path.display().to_string(), source })
}

impl TaskScheduler for JobQueue {
    fn submit(&self, task: SearchTask) -> Result<(), SchedulerError> {
        if task.task_type != TASK_TYPE {
            return Err(SchedulerError::Rejected(format!("unknown task type '{}'", task.task_type)));
        }
        let id = self.push(task).map_err(|e| SchedulerError::Unavailable(e.to_string()))?;
        tracing::debug!(task = id, "Task queued");
        Ok(())
    }
}

fn sort_for_execution(tasks: &mut [QueuedTask]) {
    tasks.sort_by_key(|t| (t.task.major_priority, t.task.minor_priority, t.id));
}
