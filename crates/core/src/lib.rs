#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! Full-text search over application content.
//!
//! Items are described by [`descriptor::WorkDescriptor`]s, queued as jobs
//! ([`jobs`]), applied to a weighted SQLite FTS5 index ([`index`]) and queried
//! through [`search::SearchManager`].

pub mod config;
pub mod descriptor;
pub mod index;
pub mod jobs;
pub mod search;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
