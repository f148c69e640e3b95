//! Durable work descriptors for pending index requests.
//!
//! Each request to index an item is written to
//! `{storage_root}/{index_info_dir}/{collection_id}.{item_id}.json` before any
//! job referencing it is queued. The job executor deletes the file once the
//! item has been applied to the index.

pub mod store;
pub mod types;

pub use store::{DEFAULT_INDEX_INFO_DIR, DescriptorError, DescriptorStore};
pub use types::{DescriptorRef, ItemMetadata, SearchableText, WeightSlot, WorkDescriptor};
