//! Capabilities supplied by the host application.

use crate::index::{SearchResult, Suggestions};

/// What a search callback receives.
#[derive(Debug, Default)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub suggestions: Suggestions,
    /// Set when the query could not run; `results` is then empty.
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Self::default() }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Callback invoked once per search.
pub type SearchCallback = Box<dyn FnOnce(SearchResponse) + Send + 'static>;

/// Tells whether the user has favourited a result.
pub trait FavoriteLookup: Send + Sync {
    fn is_favorited(&self, result: &SearchResult) -> bool;
}

/// Fallback source consulted when the local index has no hits.
pub trait BackupSearch: Send + Sync {
    fn search(&self, text: &str, limit: i64, offset: i64) -> Vec<SearchResult>;
}

/// Remote search service. Returns whether the request was accepted; the
/// response arrives later through `callback`.
pub trait RemoteSearch: Send + Sync {
    fn search(&self, text: &str, limit: i64, offset: i64, callback: SearchCallback) -> bool;
}
