pub mod doctor;
pub mod index;
pub mod output;
pub mod remove;
pub mod run;
pub mod search;
pub mod status;

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use searchdb_core::config::loader::ConfigLoader;
use searchdb_core::config::types::ResolvedConfig;
use searchdb_core::descriptor::DescriptorStore;
use searchdb_core::jobs::JobQueue;
use searchdb_core::search::{IndexRegistry, MainLoop, SearchManager};

/// Everything a command needs, built from the resolved configuration.
pub struct Session {
    pub rc: ResolvedConfig,
    pub registry: Arc<IndexRegistry>,
    pub descriptors: DescriptorStore,
    pub queue: Arc<JobQueue>,
    pub main_loop: MainLoop,
    pub manager: SearchManager,
}

impl Session {
    /// Load config, start logging and open the stores. Exits on failure.
    pub fn open(config: Option<&Path>, profile: Option<&str>) -> Self {
        let rc = match ConfigLoader::load(config, profile) {
            Ok(rc) => rc,
            Err(e) => fail("Error loading config", e),
        };
        crate::logging::init(&rc);

        let descriptors = rc.descriptor_store();
        if let Err(e) = descriptors.ensure_dir() {
            fail("Error preparing storage", e);
        }

        let queue = match JobQueue::open(&rc.queue_file, rc.queue.max_retries) {
            Ok(q) => Arc::new(q),
            Err(e) => fail("Error opening job queue", e),
        };

        let registry = Arc::new(rc.index_registry());
        let main_loop = MainLoop::new();
        let manager = SearchManager::new(
            registry.clone(),
            descriptors.clone(),
            queue.clone(),
            main_loop.context(),
        )
        .and_then(|m| m.with_worker_threads(rc.search.worker_threads))
        .unwrap_or_else(|e| fail("Error starting search", e));

        Self { rc, registry, descriptors, queue, main_loop, manager }
    }

    /// Index named on the command line, or the profile default.
    pub fn index_name(&self, requested: Option<&str>) -> String {
        requested.unwrap_or(&self.rc.default_index).to_string()
    }
}

pub fn fail(context: &str, err: impl Display) -> ! {
    eprintln!("{context}: {err}");
    std::process::exit(1);
}
