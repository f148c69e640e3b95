//! File-backed persistence of pending index requests.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use super::types::{DescriptorRef, WorkDescriptor};

/// Default directory (relative to the storage root) holding descriptors.
pub const DEFAULT_INDEX_INFO_DIR: &str = "index_info";

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Invalid index request: {0}")]
    Validation(String),

    #[error("Descriptor not found: {0}")]
    NotFound(String),

    #[error("Failed to write descriptor {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize descriptor: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Descriptor directory error at {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Durable store of [`WorkDescriptor`]s, one JSON file per
/// `(collection_id, item_id)`.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    storage_root: PathBuf,
    info_dir: String,
}

impl DescriptorStore {
    /// Create a store rooted at `storage_root`, keeping descriptors in
    /// `storage_root/info_dir`.
    pub fn new(storage_root: impl Into<PathBuf>, info_dir: impl Into<String>) -> Self {
        Self { storage_root: storage_root.into(), info_dir: info_dir.into() }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Absolute path of the descriptor directory.
    pub fn info_dir(&self) -> PathBuf {
        self.storage_root.join(&self.info_dir)
    }

    /// Create the descriptor directory if it is missing.
    pub fn ensure_dir(&self) -> Result<(), DescriptorError> {
        let dir = self.info_dir();
        fs::create_dir_all(&dir).map_err(|source| DescriptorError::Directory {
            path: dir.display().to_string(),
            source,
        })
    }

    /// Reference for the descriptor of `(collection_id, item_id)`.
    pub fn relative_ref(&self, collection_id: &str, item_id: &str) -> DescriptorRef {
        DescriptorRef::new(format!("{}/{}.{}.json", self.info_dir, collection_id, item_id))
    }

    /// Resolve a reference against the storage root.
    pub fn absolute_path(&self, reference: &DescriptorRef) -> PathBuf {
        self.storage_root.join(reference.as_str())
    }

    /// Validate and persist a descriptor, overwriting any previous one for
    /// the same key.
    pub fn save(&self, descriptor: &WorkDescriptor) -> Result<DescriptorRef, DescriptorError> {
        descriptor.validate()?;

        let reference = self.relative_ref(&descriptor.collection_id, &descriptor.item_id);
        let path = self.absolute_path(&reference);
        let json = serde_json::to_string(descriptor)?;

        self.ensure_dir()?;
        write_atomic(&path, json.as_bytes()).map_err(|source| DescriptorError::Write {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!("Saved descriptor {}", reference);
        Ok(reference)
    }

    /// Read a descriptor back. Missing, unreadable or malformed files all
    /// map to [`DescriptorError::NotFound`].
    pub fn load(&self, reference: &DescriptorRef) -> Result<WorkDescriptor, DescriptorError> {
        let path = self.absolute_path(reference);
        let content = fs::read_to_string(&path).map_err(|e| {
            tracing::warn!("Failed to read descriptor {}: {}", path.display(), e);
            DescriptorError::NotFound(reference.to_string())
        })?;

        let descriptor: WorkDescriptor = serde_json::from_str(&content).map_err(|e| {
            tracing::warn!("Malformed descriptor {}: {}", path.display(), e);
            DescriptorError::NotFound(reference.to_string())
        })?;

        if let Err(e) = descriptor.validate() {
            tracing::warn!("Invalid descriptor {}: {}", path.display(), e);
            return Err(DescriptorError::NotFound(reference.to_string()));
        }

        Ok(descriptor)
    }

    /// Best-effort delete. Returns whether a file was removed.
    pub fn delete(&self, reference: &DescriptorRef) -> bool {
        let path = self.absolute_path(reference);
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Failed to delete descriptor {}: {}", path.display(), e);
                false
            }
        }
    }

    /// References of every descriptor currently on disk, sorted.
    pub fn list(&self) -> Result<Vec<DescriptorRef>, DescriptorError> {
        let dir = self.info_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| DescriptorError::Directory {
                path: dir.display().to_string(),
                source: e.into(),
            })?;
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_file() && name.ends_with(".json") {
                refs.push(DescriptorRef::new(format!("{}/{}", self.info_dir, name)));
            }
        }
        refs.sort();
        Ok(refs)
    }

    /// Remove every descriptor and recreate an empty directory.
    pub fn reset(&self) -> Result<(), DescriptorError> {
        let dir = self.info_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|source| DescriptorError::Directory {
                path: dir.display().to_string(),
                source,
            })?;
        }
        self.ensure_dir()
    }
}

// Write to a sibling temp file and rename so readers never see a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::types::{ItemMetadata, WeightSlot};
    use tempfile::TempDir;

    fn store() -> (TempDir, DescriptorStore) {
        let dir = TempDir::new().unwrap();
        let store = DescriptorStore::new(dir.path(), DEFAULT_INDEX_INFO_DIR);
        (dir, store)
    }

    fn sample(item: &str) -> WorkDescriptor {
        WorkDescriptor::new("mod", item, "en", 2.5)
            .with_text(WeightSlot::Weight0, "sometext")
            .with_metadata(ItemMetadata::titled("Doc"))
    }

    #[test]
    fn test_save_location_is_deterministic() {
        let (_dir, store) = store();
        let reference = store.save(&sample("file22")).unwrap();

        assert_eq!(reference.as_str(), "index_info/mod.file22.json");
        assert_eq!(reference, store.relative_ref("mod", "file22"));
        assert!(store.absolute_path(&reference).exists());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = store();
        let original = sample("file1");
        let reference = store.save(&original).unwrap();

        let loaded = store.load(&reference).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_repeated_save_overwrites() {
        let (_dir, store) = store();
        store.save(&sample("file1")).unwrap();
        let updated = sample("file1").with_text(WeightSlot::Weight0, "newer");
        let reference = store.save(&updated).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.load(&reference).unwrap().text(WeightSlot::Weight0), Some("newer"));
    }

    #[test]
    fn test_invalid_descriptor_writes_nothing() {
        let (_dir, store) = store();
        let invalid = WorkDescriptor::new("", "file", "en", 1.0)
            .with_text(WeightSlot::Weight0, "text");

        let err = store.save(&invalid).unwrap_err();
        assert!(matches!(err, DescriptorError::Validation(_)));
        assert!(!store.info_dir().exists());
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let (_dir, store) = store();
        let err = store.load(&DescriptorRef::from("index_info/nope.json")).unwrap_err();
        assert!(matches!(err, DescriptorError::NotFound(_)));
    }

    #[test]
    fn test_load_malformed_is_not_found() {
        let (_dir, store) = store();
        store.ensure_dir().unwrap();
        let reference = store.relative_ref("mod", "bad");
        fs::write(store.absolute_path(&reference), "{not json").unwrap();

        let err = store.load(&reference).unwrap_err();
        assert!(matches!(err, DescriptorError::NotFound(_)));
    }

    #[test]
    fn test_delete_is_best_effort() {
        let (_dir, store) = store();
        let reference = store.save(&sample("file1")).unwrap();

        assert!(store.delete(&reference));
        assert!(!store.delete(&reference));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_reset_clears_directory() {
        let (_dir, store) = store();
        store.save(&sample("a")).unwrap();
        store.save(&sample("b")).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);

        store.reset().unwrap();
        assert!(store.info_dir().exists());
        assert!(store.list().unwrap().is_empty());
    }
}
