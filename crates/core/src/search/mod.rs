//! Search façade: index registry, request validation, job submission and
//! query dispatch.

pub mod collaborators;
pub mod main_context;
pub mod manager;
pub mod registry;

pub use collaborators::{BackupSearch, FavoriteLookup, RemoteSearch, SearchCallback, SearchResponse};
pub use main_context::{MainContext, MainLoop};
pub use manager::{SearchError, SearchManager};
pub use registry::{IndexRegistry, RegistryError};

// Re-exported so hosts can implement every collaborator from one module.
pub use crate::jobs::{CompletionSink, TaskScheduler};
