//! Applies index jobs to an [`IndexStore`].

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::descriptor::{DescriptorError, DescriptorRef, DescriptorStore};
use crate::index::{IndexError, IndexStore};

use super::types::{IndexAction, IndexJob};

/// Receives the keys of items that were indexed by a job.
///
/// Called at most once per job run, with parallel lists of equal length.
pub trait CompletionSink: Send + Sync {
    fn notify(&self, collection_ids: &[String], item_ids: &[String]);
}

/// Called after each item of an index job with `(done, total, reference)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize, &DescriptorRef) + Send + Sync>;

/// Shared flag a scheduler flips to stop a running job between items.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// An item that made it into the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedItem {
    pub collection_id: String,
    pub item_id: String,
    pub reference: DescriptorRef,
}

/// Outcome of one job run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    /// True only when every item succeeded and the job was not cancelled.
    pub success: bool,
    pub cancelled: bool,
    pub completed: Vec<CompletedItem>,
    pub failed: Vec<DescriptorRef>,
}

#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Runs [`IndexJob`]s against a single index.
pub struct IndexJobExecutor {
    store: Arc<IndexStore>,
    descriptors: DescriptorStore,
    completion: Option<Arc<dyn CompletionSink>>,
    progress: Option<ProgressCallback>,
}

impl IndexJobExecutor {
    pub fn new(store: Arc<IndexStore>, descriptors: DescriptorStore) -> Self {
        Self { store, descriptors, completion: None, progress: None }
    }

    pub fn with_completion_sink(mut self, sink: Option<Arc<dyn CompletionSink>>) -> Self {
        self.completion = sink;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run a job once.
    ///
    /// Index jobs are rewritten in place: `job.urls` is left holding only the
    /// references that did not complete, so a retry resumes where this run
    /// stopped.
    pub fn run(&self, job: &mut IndexJob, cancel: &CancellationToken) -> JobReport {
        tracing::debug!(
            action = %job.action,
            index = %job.index_name,
            items = job.urls.len(),
            "Running index job"
        );

        match job.action {
            IndexAction::Index => self.run_index(job, cancel),
            IndexAction::Remove => self.run_remove(job, cancel),
        }
    }

    fn run_index(&self, job: &mut IndexJob, cancel: &CancellationToken) -> JobReport {
        let mut report = JobReport::default();

        let mut seen = HashSet::new();
        job.urls.retain(|r| seen.insert(r.clone()));
        let total = job.urls.len();

        for (i, reference) in job.urls.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(index = %job.index_name, "Index job cancelled");
                report.cancelled = true;
                break;
            }

            match self.index_one(reference) {
                Ok(item) => report.completed.push(item),
                Err(e) => {
                    tracing::warn!(reference = %reference, error = %e, "Failed to index item");
                    report.failed.push(reference.clone());
                }
            }
            if let Some(ref cb) = self.progress {
                cb(i + 1, total, reference);
            }
        }

        let done: HashSet<&DescriptorRef> =
            report.completed.iter().map(|item| &item.reference).collect();
        let remaining: Vec<DescriptorRef> =
            job.urls.iter().filter(|r| !done.contains(r)).cloned().collect();

        for item in &report.completed {
            self.descriptors.delete(&item.reference);
        }
        job.urls = remaining;

        if let Some(sink) = self.completion.as_ref().filter(|_| !report.completed.is_empty()) {
            let (collection_ids, item_ids): (Vec<String>, Vec<String>) = report
                .completed
                .iter()
                .map(|item| (item.collection_id.clone(), item.item_id.clone()))
                .unzip();
            sink.notify(&collection_ids, &item_ids);
        }

        report.success = !report.cancelled && report.failed.is_empty();
        report
    }

    fn index_one(&self, reference: &DescriptorRef) -> Result<CompletedItem, ItemError> {
        let descriptor = self.descriptors.load(reference)?;
        self.store.index_item(&descriptor)?;
        Ok(CompletedItem {
            collection_id: descriptor.collection_id,
            item_id: descriptor.item_id,
            reference: reference.clone(),
        })
    }

    fn run_remove(&self, job: &IndexJob, cancel: &CancellationToken) -> JobReport {
        let mut report = JobReport::default();

        if cancel.is_cancelled() {
            report.cancelled = true;
            return report;
        }

        let (Some(collection_id), Some(item_id)) = (&job.collection_id, &job.item_id) else {
            tracing::warn!(index = %job.index_name, "Remove job without an item key");
            return report;
        };

        match self.store.remove_item(collection_id, item_id) {
            Ok(existed) => {
                tracing::debug!(%collection_id, %item_id, existed, "Removed item");
                report.success = true;
            }
            Err(e) => {
                tracing::warn!(%collection_id, %item_id, error = %e, "Failed to remove item");
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{WeightSlot, WorkDescriptor};
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(Vec<String>, Vec<String>)>>,
    }

    impl CompletionSink for RecordingSink {
        fn notify(&self, collection_ids: &[String], item_ids: &[String]) {
            self.calls.lock().push((collection_ids.to_vec(), item_ids.to_vec()));
        }
    }

    struct Fixture {
        _tmp: TempDir,
        store: Arc<IndexStore>,
        descriptors: DescriptorStore,
        sink: Arc<RecordingSink>,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let descriptors = DescriptorStore::new(tmp.path(), "index_info");
            Self {
                _tmp: tmp,
                store: Arc::new(IndexStore::open_in_memory().unwrap()),
                descriptors,
                sink: Arc::new(RecordingSink::default()),
            }
        }

        fn executor(&self) -> IndexJobExecutor {
            let sink: Arc<dyn CompletionSink> = self.sink.clone();
            IndexJobExecutor::new(self.store.clone(), self.descriptors.clone())
                .with_completion_sink(Some(sink))
        }

        fn save(&self, collection: &str, item: &str, text: &str) -> DescriptorRef {
            let d = WorkDescriptor::new(collection, item, "en", 1.0)
                .with_text(WeightSlot::Weight0, text);
            self.descriptors.save(&d).unwrap()
        }
    }

    #[test]
    fn test_index_job_success() {
        let fx = Fixture::new();
        let a = fx.save("m", "a", "alpha");
        let b = fx.save("m", "b", "beta");
        let mut job = IndexJob::index(vec![a.clone(), b.clone()], "docs");

        let report = fx.executor().run(&mut job, &CancellationToken::new());

        assert!(report.success);
        assert_eq!(report.completed.len(), 2);
        assert!(job.urls.is_empty());
        assert_eq!(fx.store.count_items().unwrap(), 2);
        assert!(!fx.descriptors.absolute_path(&a).exists());
        assert!(!fx.descriptors.absolute_path(&b).exists());

        let calls = fx.sink.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec!["m", "m"]);
        assert_eq!(calls[0].1, vec!["a", "b"]);
    }

    #[test]
    fn test_partial_failure_keeps_remaining() {
        let fx = Fixture::new();
        let a = fx.save("m", "a", "alpha");
        let b = DescriptorRef::new("index_info/m.b.json");
        let mut job = IndexJob::index(vec![a.clone(), b.clone()], "docs");

        let report = fx.executor().run(&mut job, &CancellationToken::new());

        assert!(!report.success);
        assert_eq!(report.failed, vec![b.clone()]);
        assert_eq!(job.urls, vec![b]);
        assert!(!fx.descriptors.absolute_path(&a).exists());
        assert!(fx.store.get_item("m", "a").unwrap().is_some());

        let calls = fx.sink.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec!["a"]);
    }

    #[test]
    fn test_retry_resumes_with_remaining() {
        let fx = Fixture::new();
        let a = fx.save("m", "a", "alpha");
        let b = DescriptorRef::new("index_info/m.b.json");
        let mut job = IndexJob::index(vec![a, b], "docs");
        let executor = fx.executor();

        assert!(!executor.run(&mut job, &CancellationToken::new()).success);

        fx.save("m", "b", "beta");
        let report = executor.run(&mut job, &CancellationToken::new());

        assert!(report.success);
        assert!(job.urls.is_empty());
        assert_eq!(fx.store.count_items().unwrap(), 2);
    }

    #[test]
    fn test_all_failed_does_not_notify() {
        let fx = Fixture::new();
        let missing = DescriptorRef::new("index_info/m.x.json");
        let mut job = IndexJob::index(vec![missing.clone()], "docs");

        let report = fx.executor().run(&mut job, &CancellationToken::new());

        assert!(!report.success);
        assert_eq!(job.urls, vec![missing]);
        assert!(fx.sink.calls.lock().is_empty());
    }

    #[test]
    fn test_cancelled_before_start() {
        let fx = Fixture::new();
        let a = fx.save("m", "a", "alpha");
        let mut job = IndexJob::index(vec![a.clone()], "docs");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = fx.executor().run(&mut job, &cancel);

        assert!(!report.success);
        assert!(report.cancelled);
        assert_eq!(job.urls, vec![a.clone()]);
        assert!(fx.descriptors.absolute_path(&a).exists());
        assert_eq!(fx.store.count_items().unwrap(), 0);
    }

    #[test]
    fn test_cancelled_between_items() {
        let fx = Fixture::new();
        let a = fx.save("m", "a", "alpha");
        let b = fx.save("m", "b", "beta");
        let c = fx.save("m", "c", "gamma");
        let mut job = IndexJob::index(vec![a.clone(), b.clone(), c.clone()], "docs");

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let executor = fx.executor().with_progress(Box::new(move |done, _total, _reference| {
            if done == 1 {
                trigger.cancel();
            }
        }));

        let report = executor.run(&mut job, &cancel);

        assert!(report.cancelled);
        assert!(!report.success);
        assert!(report.failed.is_empty());
        assert_eq!(report.completed.len(), 1);
        assert_eq!(job.urls, vec![b.clone(), c.clone()]);

        assert!(!fx.descriptors.absolute_path(&a).exists());
        assert!(fx.descriptors.absolute_path(&b).exists());
        assert!(fx.descriptors.absolute_path(&c).exists());
        assert!(fx.store.get_item("m", "a").unwrap().is_some());
        assert_eq!(fx.store.count_items().unwrap(), 1);

        let calls = fx.sink.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec!["a"]);
    }

    #[test]
    fn test_duplicate_references_processed_once() {
        let fx = Fixture::new();
        let a = fx.save("m", "a", "alpha");
        let b = fx.save("m", "b", "beta");
        let mut job = IndexJob::index(vec![a.clone(), b.clone(), a.clone()], "docs");

        let steps = Arc::new(Mutex::new(Vec::new()));
        let seen = steps.clone();
        let executor = fx.executor().with_progress(Box::new(move |done, total, _reference| {
            seen.lock().push((done, total));
        }));

        let report = executor.run(&mut job, &CancellationToken::new());

        assert!(report.success);
        assert_eq!(report.completed.len(), 2);
        assert_eq!(*steps.lock(), vec![(1, 2), (2, 2)]);
        let calls = fx.sink.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_job() {
        let fx = Fixture::new();
        let a = fx.save("m", "a", "alpha");
        let executor = fx.executor();
        executor.run(&mut IndexJob::index(vec![a], "docs"), &CancellationToken::new());
        fx.sink.calls.lock().clear();

        let mut job = IndexJob::remove("m", "a", "docs");
        let report = executor.run(&mut job, &CancellationToken::new());

        assert!(report.success);
        assert_eq!(fx.store.count_items().unwrap(), 0);
        assert!(fx.sink.calls.lock().is_empty());
    }

    #[test]
    fn test_remove_missing_item_succeeds() {
        let fx = Fixture::new();
        let mut job = IndexJob::remove("m", "ghost", "docs");
        assert!(fx.executor().run(&mut job, &CancellationToken::new()).success);
    }

    #[test]
    fn test_remove_without_key_fails() {
        let fx = Fixture::new();
        let mut job = IndexJob::remove("m", "a", "docs");
        job.item_id = None;
        assert!(!fx.executor().run(&mut job, &CancellationToken::new()).success);
    }

    #[test]
    fn test_remove_cancelled() {
        let fx = Fixture::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = fx.executor().run(&mut IndexJob::remove("m", "a", "docs"), &cancel);
        assert!(!report.success);
        assert!(report.cancelled);
    }
}
