//! Weighted full-text index.
//!
//! This module provides SQLite FTS5-based storage for:
//! - Index entries: five weighted text slots plus a per-item boost
//! - Metadata entries: title, subtitle, uri, display type and image
//! - Ranked queries with completion suggestions
//!
//! # Example
//!
//! ```no_run
//! use searchdb_core::descriptor::{WeightSlot, WorkDescriptor};
//! use searchdb_core::index::IndexStore;
//! use std::path::Path;
//!
//! let store = IndexStore::open(Path::new("docs.sqlite")).unwrap();
//! let item = WorkDescriptor::new("mod1", "fileA", "en", 2.0)
//!     .with_text(WeightSlot::Weight0, "hello world");
//! store.index_item(&item).unwrap();
//!
//! let outcome = store.search("hello", 10, 0).unwrap();
//! for hit in &outcome.results {
//!     println!("{} {:.3}", hit.item_id, hit.score);
//! }
//! ```

pub mod db;
pub mod query;
pub mod schema;
pub mod types;

pub use db::{DEFAULT_SUGGESTION_LIMIT, IndexError, IndexStore, SLOT_WEIGHTS};
pub use query::{MatchQuery, Suggestions, build_match_query};
pub use schema::{SCHEMA_VERSION, SchemaError};
pub use types::{IndexedItem, SearchOutcome, SearchResult};
