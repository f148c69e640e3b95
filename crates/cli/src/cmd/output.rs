//! Shared output formatting.

use searchdb_core::index::SearchResult;
use searchdb_core::jobs::QueuedTask;
use serde::Serialize;

/// Search hit for JSON output.
#[derive(Debug, Serialize)]
pub struct ResultOutput {
    pub collection_id: String,
    pub item_id: String,
    pub language: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

impl From<&SearchResult> for ResultOutput {
    fn from(r: &SearchResult) -> Self {
        Self {
            collection_id: r.collection_id.clone(),
            item_id: r.item_id.clone(),
            language: r.language.clone(),
            score: r.score,
            title: r.title.clone(),
            subtitle: r.subtitle.clone(),
            uri: r.uri.clone(),
            display_type: r.display_type.clone(),
            image_uri: r.image_uri.clone(),
        }
    }
}

/// Queued task for JSON output.
#[derive(Debug, Serialize)]
pub struct TaskOutput {
    pub id: u64,
    pub action: String,
    pub index: String,
    pub items: usize,
    pub attempts: u32,
    pub held: bool,
    pub enqueued_at: String,
}

impl From<&QueuedTask> for TaskOutput {
    fn from(t: &QueuedTask) -> Self {
        Self {
            id: t.id,
            action: t.task.job.action.to_string(),
            index: t.task.job.index_name.clone(),
            items: t.task.job.urls.len().max(1),
            attempts: t.attempts,
            held: t.held,
            enqueued_at: t.enqueued_at.to_rfc3339(),
        }
    }
}

/// Truncate string with ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 8), "a lon...");
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("héllo wörld", 7), "héll...");
    }
}
