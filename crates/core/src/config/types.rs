use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::descriptor::DescriptorStore;
use crate::index::DEFAULT_SUGGESTION_LIMIT;
use crate::jobs::DEFAULT_MAX_RETRIES;
use crate::search::IndexRegistry;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    pub profile: Option<String>,
    pub profiles: HashMap<String, Profile>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    /// Directory holding the index databases and descriptor directory.
    pub storage_root: String,
    /// Descriptor directory name, relative to `storage_root`.
    #[serde(default)]
    pub index_info_dir: Option<String>,
    /// Queue file location (defaults to `{{storage_root}}/jobs.json`).
    #[serde(default)]
    pub queue_file: Option<String>,
    /// Index used when a command does not name one.
    #[serde(default)]
    pub default_index: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Query worker threads; 0 means one per CPU.
    #[serde(default)]
    pub worker_threads: usize,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { worker_threads: 0, suggestion_limit: default_suggestion_limit() }
    }
}

fn default_suggestion_limit() -> usize {
    DEFAULT_SUGGESTION_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_retries: default_max_retries() }
    }
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub active_profile: String,
    pub storage_root: PathBuf,
    pub index_info_dir: String,
    pub queue_file: PathBuf,
    pub default_index: String,
    pub search: SearchConfig,
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
}

impl ResolvedConfig {
    pub fn descriptor_store(&self) -> DescriptorStore {
        DescriptorStore::new(&self.storage_root, &self.index_info_dir)
    }

    /// File-backed registry rooted at `storage_root`.
    pub fn index_registry(&self) -> IndexRegistry {
        IndexRegistry::new(&self.storage_root).with_suggestion_limit(self.search.suggestion_limit)
    }
}
