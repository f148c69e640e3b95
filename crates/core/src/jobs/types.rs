//! Job payloads handed to the scheduler.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::DescriptorRef;

/// Task type tag of every search maintenance task.
pub const TASK_TYPE: &str = "searchdb.task.search";
/// Priority tier shared by all search maintenance tasks.
pub const MAJOR_PRIORITY: i32 = 1000;
/// Sub-priority of index tasks (smaller runs first).
pub const MINOR_PRIORITY_INDEX: i32 = 1000;
/// Sub-priority of remove tasks.
pub const MINOR_PRIORITY_REMOVE: i32 = 10000;

/// What a job does. Serialized as `0` (index) or `1` (remove).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum IndexAction {
    Index,
    Remove,
}

impl IndexAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for IndexAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<IndexAction> for u8 {
    fn from(action: IndexAction) -> Self {
        match action {
            IndexAction::Index => 0,
            IndexAction::Remove => 1,
        }
    }
}

impl TryFrom<u8> for IndexAction {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Index),
            1 => Ok(Self::Remove),
            other => Err(format!("unknown index action {other}")),
        }
    }
}

/// A batch of index work against one named index.
///
/// For [`IndexAction::Index`] the `urls` list holds the descriptors still to
/// apply; it only ever shrinks as items succeed. For [`IndexAction::Remove`]
/// the key is carried in `collection_id`/`item_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexJob {
    #[serde(rename = "urlarray", default)]
    pub urls: Vec<DescriptorRef>,
    #[serde(rename = "type")]
    pub action: IndexAction,
    #[serde(rename = "databasename")]
    pub index_name: String,
    #[serde(rename = "moduleid", default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(rename = "fileid", default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl IndexJob {
    /// Job applying a list of descriptors.
    pub fn index(urls: Vec<DescriptorRef>, index_name: impl Into<String>) -> Self {
        Self {
            urls,
            action: IndexAction::Index,
            index_name: index_name.into(),
            collection_id: None,
            item_id: None,
        }
    }

    /// Job removing a single item.
    pub fn remove(
        collection_id: impl Into<String>,
        item_id: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            urls: Vec::new(),
            action: IndexAction::Remove,
            index_name: index_name.into(),
            collection_id: Some(collection_id.into()),
            item_id: Some(item_id.into()),
        }
    }
}

/// A job wrapped with the scheduling attributes the scheduler needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTask {
    pub task_type: String,
    pub job: IndexJob,
    pub major_priority: i32,
    pub minor_priority: i32,
    pub requires_internet: bool,
    pub hold_after_max_retries: bool,
}

impl SearchTask {
    /// Wrap a job with the search maintenance priorities.
    pub fn for_job(job: IndexJob) -> Self {
        let minor_priority = match job.action {
            IndexAction::Index => MINOR_PRIORITY_INDEX,
            IndexAction::Remove => MINOR_PRIORITY_REMOVE,
        };
        Self {
            task_type: TASK_TYPE.to_string(),
            job,
            major_priority: MAJOR_PRIORITY,
            minor_priority,
            requires_internet: false,
            hold_after_max_retries: true,
        }
    }
}
