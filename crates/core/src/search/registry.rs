//! Named index registry.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::index::{DEFAULT_SUGGESTION_LIMIT, IndexError, IndexStore};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid index name: '{0}'")]
    InvalidName(String),

    #[error("Failed to open index '{name}': {source}")]
    Open {
        name: String,
        #[source]
        source: IndexError,
    },

    #[error("Failed to create index directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maps index names to open stores.
///
/// Each name is opened at most once; concurrent registrations of the same
/// name share a single store.
pub struct IndexRegistry {
    root: Option<PathBuf>,
    suggestion_limit: usize,
    stores: RwLock<HashMap<String, Arc<IndexStore>>>,
}

impl IndexRegistry {
    /// Registry keeping each index in `root/{name}.sqlite`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Registry whose indexes live only in memory.
    pub fn in_memory() -> Self {
        Self {
            root: None,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    /// On-disk location of an index, if this registry is file-backed.
    pub fn index_path(&self, name: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(format!("{name}.sqlite")))
    }

    /// Open (or return the already open) index called `name`.
    pub fn register(&self, name: &str) -> Result<Arc<IndexStore>, RegistryError> {
        validate_name(name)?;

        if let Some(store) = self.stores.read().get(name) {
            return Ok(store.clone());
        }

        let mut stores = self.stores.write();
        if let Some(store) = stores.get(name) {
            return Ok(store.clone());
        }

        let store = self.open_store(name)?;
        tracing::info!(index = name, path = ?store.path(), "Registered index");
        let store = Arc::new(store);
        stores.insert(name.to_string(), store.clone());
        Ok(store)
    }

    pub fn get(&self, name: &str) -> Option<Arc<IndexStore>> {
        self.stores.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stores.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn open_store(&self, name: &str) -> Result<IndexStore, RegistryError> {
        let open_err = |source| RegistryError::Open { name: name.to_string(), source };

        let store = match (&self.root, self.index_path(name)) {
            (Some(root), Some(path)) => {
                fs::create_dir_all(root).map_err(|source| RegistryError::Directory {
                    path: root.display().to_string(),
                    source,
                })?;
                IndexStore::open(&path).map_err(open_err)?
            }
            _ => IndexStore::open_in_memory().map_err(open_err)?,
        };
        Ok(store.with_suggestion_limit(self.suggestion_limit))
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), RegistryError> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}
