//! Entry point used by applications.

use std::sync::Arc;

use thiserror::Error;

use super::collaborators::{BackupSearch, FavoriteLookup, RemoteSearch, SearchCallback, SearchResponse};
use super::main_context::MainContext;
use super::registry::{IndexRegistry, RegistryError, validate_name};
use crate::descriptor::{DescriptorError, DescriptorRef, DescriptorStore, WorkDescriptor};
use crate::jobs::{IndexJob, SchedulerError, SearchTask, TaskScheduler};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to queue task: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Remote search rejected the request")]
    RemoteRejected,

    #[error("Failed to start search workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

type Result<T> = std::result::Result<T, SearchError>;

/// Validates index requests, queues them, and answers queries.
///
/// Queries run on an internal worker pool; every callback is delivered
/// through the [`MainContext`] given at construction.
pub struct SearchManager {
    registry: Arc<IndexRegistry>,
    descriptors: DescriptorStore,
    scheduler: Arc<dyn TaskScheduler>,
    main: MainContext,
    pool: rayon::ThreadPool,
    favorites: Option<Arc<dyn FavoriteLookup>>,
    backup: Option<Arc<dyn BackupSearch>>,
    remote: Option<Arc<dyn RemoteSearch>>,
}

impl SearchManager {
    pub fn new(
        registry: Arc<IndexRegistry>,
        descriptors: DescriptorStore,
        scheduler: Arc<dyn TaskScheduler>,
        main: MainContext,
    ) -> Result<Self> {
        Ok(Self {
            registry,
            descriptors,
            scheduler,
            main,
            pool: build_pool(0)?,
            favorites: None,
            backup: None,
            remote: None,
        })
    }

    /// Size the query pool. Zero picks one worker per CPU.
    pub fn with_worker_threads(mut self, threads: usize) -> Result<Self> {
        self.pool = build_pool(threads)?;
        Ok(self)
    }

    pub fn with_favorites(mut self, favorites: Arc<dyn FavoriteLookup>) -> Self {
        self.favorites = Some(favorites);
        self
    }

    pub fn with_backup(mut self, backup: Arc<dyn BackupSearch>) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteSearch>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    pub fn descriptors(&self) -> &DescriptorStore {
        &self.descriptors
    }

    pub fn register_index(&self, name: &str) -> Result<()> {
        self.registry.register(name)?;
        Ok(())
    }

    /// Persist `descriptor` and queue a job indexing it into `index_name`.
    ///
    /// Nothing is written when validation fails.
    pub fn enqueue_index(&self, descriptor: &WorkDescriptor, index_name: &str) -> Result<DescriptorRef> {
        require_index_name(index_name)?;
        let reference = self.descriptors.save(descriptor)?;
        self.enqueue_index_batch(vec![reference.clone()], index_name)?;
        Ok(reference)
    }

    /// Queue a job indexing already persisted descriptors.
    pub fn enqueue_index_batch(&self, urls: Vec<DescriptorRef>, index_name: &str) -> Result<()> {
        if urls.is_empty() {
            return Err(SearchError::InvalidRequest("no descriptors to index".into()));
        }
        require_index_name(index_name)?;

        let count = urls.len();
        self.scheduler.submit(SearchTask::for_job(IndexJob::index(urls, index_name)))?;
        tracing::info!(index = index_name, items = count, "Queued index job");
        Ok(())
    }

    /// Queue removal of one item from `index_name`.
    pub fn enqueue_remove(&self, collection_id: &str, item_id: &str, index_name: &str) -> Result<()> {
        require("collection id", collection_id)?;
        require("item id", item_id)?;
        require_index_name(index_name)?;

        self.scheduler
            .submit(SearchTask::for_job(IndexJob::remove(collection_id, item_id, index_name)))?;
        tracing::info!(index = index_name, collection_id, item_id, "Queued remove job");
        Ok(())
    }

    /// Query `index_name` off the caller's thread.
    ///
    /// `callback` runs exactly once on the main loop. A `limit` below one
    /// yields an empty response without touching the index.
    pub fn search<F>(&self, text: &str, limit: i64, offset: i64, index_name: &str, callback: F)
    where
        F: FnOnce(SearchResponse) + Send + 'static,
    {
        if limit < 1 {
            self.deliver(SearchResponse::empty(), Box::new(callback));
            return;
        }

        let text = text.to_string();
        let index_name = index_name.to_string();
        let registry = self.registry.clone();
        let favorites = self.favorites.clone();
        let backup = self.backup.clone();
        let main = self.main.clone();

        self.pool.spawn(move || {
            let response = run_local_search(
                &registry,
                favorites.as_deref(),
                backup.as_deref(),
                &text,
                limit,
                offset,
                &index_name,
            );
            if !main.post(move || callback(response)) {
                tracing::warn!("Main loop is gone; dropping search response");
            }
        });
    }

    /// Local search plus, when configured, a remote search. Each response
    /// reaches its own callback on the main loop.
    pub fn full_search<L, R>(
        &self,
        text: &str,
        limit: i64,
        offset: i64,
        index_name: &str,
        local_callback: L,
        remote_callback: R,
    ) -> Result<()>
    where
        L: FnOnce(SearchResponse) + Send + 'static,
        R: FnOnce(SearchResponse) + Send + 'static,
    {
        self.search(text, limit, offset, index_name, local_callback);

        let Some(remote) = &self.remote else {
            return Ok(());
        };
        let main = self.main.clone();
        let forward: SearchCallback = Box::new(move |response| {
            main.post(move || remote_callback(response));
        });
        if remote.search(text, limit, offset, forward) {
            Ok(())
        } else {
            tracing::warn!(index = index_name, "Remote search rejected request");
            Err(SearchError::RemoteRejected)
        }
    }

    /// Drop every pending descriptor.
    pub fn reset_descriptors(&self) -> Result<()> {
        self.descriptors.reset()?;
        Ok(())
    }

    fn deliver(&self, response: SearchResponse, callback: SearchCallback) {
        if !self.main.post(move || callback(response)) {
            tracing::warn!("Main loop is gone; dropping search response");
        }
    }
}

fn run_local_search(
    registry: &IndexRegistry,
    favorites: Option<&dyn FavoriteLookup>,
    backup: Option<&dyn BackupSearch>,
    text: &str,
    limit: i64,
    offset: i64,
    index_name: &str,
) -> SearchResponse {
    let Some(store) = registry.get(index_name) else {
        return SearchResponse::failed(format!("Unknown index '{index_name}'"));
    };

    let outcome = match store.search(text, limit, offset) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(index = index_name, error = %e, "Search failed");
            return SearchResponse::failed(e.to_string());
        }
    };

    let mut results = outcome.results;
    if results.is_empty() {
        if let Some(backup) = backup {
            results = backup.search(text, limit, offset);
            tracing::debug!(index = index_name, hits = results.len(), "Used backup search");
        }
    } else if let Some(favorites) = favorites {
        for result in &mut results {
            result.is_favorited = favorites.is_favorited(result);
        }
    }

    SearchResponse { results, suggestions: outcome.suggestions, error: None }
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SearchError::InvalidRequest(format!("{what} is required")));
    }
    Ok(())
}

/// Index names must be openable by the registry, so a queued job can never
/// fail on its name alone.
fn require_index_name(name: &str) -> Result<()> {
    require("index name", name)?;
    validate_name(name).map_err(|e| SearchError::InvalidRequest(e.to_string()))
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("searchdb-query-{i}"))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::WeightSlot;
    use crate::index::SearchResult;
    use crate::search::MainLoop;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingScheduler {
        tasks: Mutex<Vec<SearchTask>>,
    }

    impl TaskScheduler for RecordingScheduler {
        fn submit(&self, task: SearchTask) -> std::result::Result<(), SchedulerError> {
            self.tasks.lock().push(task);
            Ok(())
        }
    }

    struct Favorites;

    impl FavoriteLookup for Favorites {
        fn is_favorited(&self, result: &SearchResult) -> bool {
            result.item_id == "fav"
        }
    }

    struct Backup;

    impl BackupSearch for Backup {
        fn search(&self, _text: &str, _limit: i64, _offset: i64) -> Vec<SearchResult> {
            vec![SearchResult::new("backup", "b1")]
        }
    }

    struct Remote {
        accept: bool,
    }

    impl RemoteSearch for Remote {
        fn search(&self, _text: &str, _limit: i64, _offset: i64, callback: SearchCallback) -> bool {
            if self.accept {
                std::thread::spawn(move || callback(SearchResponse::failed("offline")));
            }
            self.accept
        }
    }

    struct Fixture {
        _tmp: TempDir,
        main_loop: MainLoop,
        scheduler: Arc<RecordingScheduler>,
        manager: SearchManager,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let main_loop = MainLoop::new();
            let scheduler = Arc::new(RecordingScheduler::default());
            let manager = SearchManager::new(
                Arc::new(IndexRegistry::in_memory()),
                DescriptorStore::new(tmp.path(), "index_info"),
                scheduler.clone(),
                main_loop.context(),
            )
            .unwrap()
            .with_worker_threads(2)
            .unwrap();
            Self { _tmp: tmp, main_loop, scheduler, manager }
        }

        fn index_now(&self, index: &str, item: &str, text: &str) {
            let store = self.manager.registry().register(index).unwrap();
            let d = WorkDescriptor::new("m", item, "en", 1.0).with_text(WeightSlot::Weight0, text);
            store.index_item(&d).unwrap();
        }

        fn search(&self, text: &str, limit: i64, index: &str) -> SearchResponse {
            let slot = Arc::new(Mutex::new(None));
            let out = slot.clone();
            self.manager.search(text, limit, 0, index, move |r| *out.lock() = Some(r));
            assert!(self.main_loop.run_one(Duration::from_secs(5)));
            let response = slot.lock().take().unwrap();
            response
        }
    }

    #[test]
    fn test_enqueue_index_saves_and_submits() {
        let fx = Fixture::new();
        let d = WorkDescriptor::new("m", "a", "en", 1.0).with_text(WeightSlot::Weight0, "x");

        let reference = fx.manager.enqueue_index(&d, "docs").unwrap();

        assert!(fx.manager.descriptors().absolute_path(&reference).exists());
        let tasks = fx.scheduler.tasks.lock();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].job.urls, vec![reference]);
        assert_eq!(tasks[0].minor_priority, crate::jobs::MINOR_PRIORITY_INDEX);
    }

    #[test]
    fn test_invalid_enqueue_writes_nothing() {
        let fx = Fixture::new();
        let no_text = WorkDescriptor::new("m", "a", "en", 1.0);

        assert!(fx.manager.enqueue_index(&no_text, "docs").is_err());
        let valid = no_text.with_text(WeightSlot::Weight1, "x");
        assert!(fx.manager.enqueue_index(&valid, "").is_err());

        assert!(fx.manager.descriptors().list().unwrap().is_empty());
        assert!(fx.scheduler.tasks.lock().is_empty());
    }

    #[test]
    fn test_batch_and_remove_validation() {
        let fx = Fixture::new();
        assert!(fx.manager.enqueue_index_batch(vec![], "docs").is_err());
        assert!(fx.manager.enqueue_index_batch(vec!["index_info/m.a.json".into()], "").is_err());
        assert!(fx.manager.enqueue_remove("", "a", "docs").is_err());
        assert!(fx.manager.enqueue_remove("m", "a", "").is_err());
        assert!(fx.scheduler.tasks.lock().is_empty());

        fx.manager.enqueue_remove("m", "a", "docs").unwrap();
        let tasks = fx.scheduler.tasks.lock();
        assert_eq!(tasks[0].minor_priority, crate::jobs::MINOR_PRIORITY_REMOVE);
    }

    #[rstest::rstest]
    #[case("a/b")]
    #[case("..")]
    #[case("dir\\docs")]
    fn test_unopenable_index_name_rejected(#[case] index: &str) {
        let fx = Fixture::new();
        let d = WorkDescriptor::new("m", "a", "en", 1.0).with_text(WeightSlot::Weight0, "x");

        let err = fx.manager.enqueue_index(&d, index).unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)));
        assert!(fx.manager.enqueue_index_batch(vec!["index_info/m.a.json".into()], index).is_err());
        assert!(fx.manager.enqueue_remove("m", "a", index).is_err());

        assert!(fx.manager.descriptors().list().unwrap().is_empty());
        assert!(fx.scheduler.tasks.lock().is_empty());
    }

    #[test]
    fn test_search_applies_favorites() {
        let mut fx = Fixture::new();
        fx.manager = fx.manager.with_favorites(Arc::new(Favorites));
        fx.index_now("docs", "fav", "shared words");
        fx.index_now("docs", "plain", "shared words");

        let response = fx.search("shared", 10, "docs");

        assert!(response.is_ok());
        assert_eq!(response.results.len(), 2);
        for r in &response.results {
            assert_eq!(r.is_favorited, r.item_id == "fav");
        }
    }

    #[test]
    fn test_backup_used_when_no_hits() {
        let mut fx = Fixture::new();
        fx.manager = fx.manager.with_backup(Arc::new(Backup));
        fx.index_now("docs", "a", "alpha");

        let response = fx.search("zzz", 10, "docs");

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].item_id, "b1");
    }

    #[test]
    fn test_limit_below_one_is_empty() {
        let fx = Fixture::new();
        fx.index_now("docs", "a", "alpha");

        let response = fx.search("alpha", 0, "docs");

        assert!(response.is_ok());
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_unknown_index_reports_error() {
        let fx = Fixture::new();
        let response = fx.search("alpha", 10, "missing");

        assert!(response.results.is_empty());
        assert!(response.error.unwrap().contains("missing"));
    }

    #[test]
    fn test_full_search_remote_rejected() {
        let mut fx = Fixture::new();
        fx.manager = fx.manager.with_remote(Arc::new(Remote { accept: false }));
        fx.manager.register_index("docs").unwrap();

        let result = fx.manager.full_search("a", 5, 0, "docs", |_| {}, |_| {});

        assert!(matches!(result, Err(SearchError::RemoteRejected)));
    }

    #[test]
    fn test_full_search_delivers_both_callbacks() {
        let mut fx = Fixture::new();
        fx.manager = fx.manager.with_remote(Arc::new(Remote { accept: true }));
        fx.index_now("docs", "a", "alpha");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (local, remote) = (seen.clone(), seen.clone());
        fx.manager
            .full_search(
                "alpha",
                5,
                0,
                "docs",
                move |r| local.lock().push(("local", r.results.len())),
                move |r| remote.lock().push(("remote", r.results.len())),
            )
            .unwrap();

        assert!(fx.main_loop.run_one(Duration::from_secs(5)));
        assert!(fx.main_loop.run_one(Duration::from_secs(5)));
        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen, vec![("local", 1), ("remote", 0)]);
    }
}
