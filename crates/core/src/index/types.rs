//! Index data types.

use serde::Serialize;

use super::query::Suggestions;
use crate::descriptor::{ItemMetadata, SearchableText};

/// One ranked hit from the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub collection_id: String,
    pub item_id: String,
    pub language: String,
    /// Combined relevance (slot-weighted text score times boost).
    pub score: f64,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub uri: Option<String>,
    pub display_type: Option<String>,
    pub image_uri: Option<String>,
    /// Filled in by the search manager from the favourites collaborator.
    pub is_favorited: bool,
}

impl SearchResult {
    /// A result carrying only its key, for collaborators that build results
    /// outside the index.
    pub fn new(collection_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            item_id: item_id.into(),
            language: String::new(),
            score: 0.0,
            title: None,
            subtitle: None,
            uri: None,
            display_type: None,
            image_uri: None,
            is_favorited: false,
        }
    }
}

/// Results and suggestions for one query.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub suggestions: Suggestions,
}

impl SearchOutcome {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// An index entry read back together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem {
    pub collection_id: String,
    pub item_id: String,
    pub language: String,
    pub boost: f64,
    pub searchable_text: SearchableText,
    pub metadata: ItemMetadata,
}
