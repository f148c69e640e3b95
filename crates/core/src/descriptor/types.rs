//! Work descriptor data types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::store::DescriptorError;

/// One of the five weighted text fields of an index entry.
///
/// `Weight0` carries the most relevance, `Weight4` the least.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WeightSlot {
    Weight0,
    Weight1,
    Weight2,
    Weight3,
    Weight4,
}

impl WeightSlot {
    /// All slots, most important first.
    pub const ALL: [WeightSlot; 5] = [
        WeightSlot::Weight0,
        WeightSlot::Weight1,
        WeightSlot::Weight2,
        WeightSlot::Weight3,
        WeightSlot::Weight4,
    ];

    /// Position of the slot, 0 being the highest weighted.
    pub fn index(self) -> usize {
        match self {
            Self::Weight0 => 0,
            Self::Weight1 => 1,
            Self::Weight2 => 2,
            Self::Weight3 => 3,
            Self::Weight4 => 4,
        }
    }

    /// Column / JSON key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weight0 => "weight0",
            Self::Weight1 => "weight1",
            Self::Weight2 => "weight2",
            Self::Weight3 => "weight3",
            Self::Weight4 => "weight4",
        }
    }

    /// Parse a slot name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "weight0" => Some(Self::Weight0),
            "weight1" => Some(Self::Weight1),
            "weight2" => Some(Self::Weight2),
            "weight3" => Some(Self::Weight3),
            "weight4" => Some(Self::Weight4),
            _ => None,
        }
    }
}

impl fmt::Display for WeightSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Searchable strings keyed by weight slot.
pub type SearchableText = BTreeMap<WeightSlot, String>;

/// Display metadata stored next to an index entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Display type of the item (`type` on disk, `filetype` accepted).
    #[serde(
        rename = "type",
        alias = "filetype",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_type: Option<String>,
    #[serde(rename = "imageuri", default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

impl ItemMetadata {
    /// Metadata with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Default::default() }
    }
}

/// A pending index request, as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDescriptor {
    #[serde(rename = "moduleid")]
    pub collection_id: String,
    #[serde(rename = "fileid")]
    pub item_id: String,
    pub language: String,
    pub boost: f64,
    #[serde(rename = "searchablestrings", default)]
    pub searchable_text: SearchableText,
    #[serde(rename = "filemetadata", default)]
    pub metadata: ItemMetadata,
}

impl WorkDescriptor {
    /// Create a descriptor with no searchable text or metadata yet.
    pub fn new(
        collection_id: impl Into<String>,
        item_id: impl Into<String>,
        language: impl Into<String>,
        boost: f64,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            item_id: item_id.into(),
            language: language.into(),
            boost,
            searchable_text: SearchableText::new(),
            metadata: ItemMetadata::default(),
        }
    }

    /// Set the text of one weight slot.
    pub fn with_text(mut self, slot: WeightSlot, text: impl Into<String>) -> Self {
        self.searchable_text.insert(slot, text.into());
        self
    }

    /// Replace the display metadata.
    pub fn with_metadata(mut self, metadata: ItemMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Text for a slot, if present.
    pub fn text(&self, slot: WeightSlot) -> Option<&str> {
        self.searchable_text.get(&slot).map(String::as_str)
    }

    /// True when at least one slot holds non-empty text.
    pub fn has_searchable_text(&self) -> bool {
        self.searchable_text.values().any(|s| !s.is_empty())
    }

    /// Check the required fields.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        validate_id("collection id", &self.collection_id)?;
        validate_id("item id", &self.item_id)?;
        if self.language.is_empty() {
            return Err(DescriptorError::Validation("language is required".into()));
        }
        if !self.boost.is_finite() || self.boost < 0.0 {
            return Err(DescriptorError::Validation(format!(
                "boost must be a finite, non-negative number (got {})",
                self.boost
            )));
        }
        if !self.has_searchable_text() {
            return Err(DescriptorError::Validation(
                "at least one searchable string must be non-empty".into(),
            ));
        }
        Ok(())
    }
}

// Ids become part of the descriptor file name.
fn validate_id(what: &str, id: &str) -> Result<(), DescriptorError> {
    if id.is_empty() {
        return Err(DescriptorError::Validation(format!("{what} is required")));
    }
    if id.contains(['/', '\\', '\0']) || id == "." || id == ".." {
        return Err(DescriptorError::Validation(format!(
            "{what} '{id}' contains path characters"
        )));
    }
    Ok(())
}

/// Reference to a stored descriptor, relative to the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorRef(String);

impl DescriptorRef {
    pub fn new(relative: impl Into<String>) -> Self {
        Self(relative.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DescriptorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DescriptorRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DescriptorRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkDescriptor {
        WorkDescriptor::new("mod", "file22", "en", 8323.3)
            .with_text(WeightSlot::Weight0, "sometext")
            .with_text(WeightSlot::Weight3, "othertext")
    }

    #[test]
    fn test_weight_slot_names() {
        for slot in WeightSlot::ALL {
            assert_eq!(WeightSlot::parse(slot.as_str()), Some(slot));
        }
        assert_eq!(WeightSlot::parse("WEIGHT2"), Some(WeightSlot::Weight2));
        assert_eq!(WeightSlot::parse("weight5"), None);
        assert_eq!(WeightSlot::Weight4.index(), 4);
    }

    #[test]
    fn test_descriptor_json_keys() {
        let d = sample().with_metadata(ItemMetadata {
            display_type: Some("doc".into()),
            image_uri: Some("img://a".into()),
            ..Default::default()
        });
        let value = serde_json::to_value(&d).unwrap();

        assert_eq!(value["moduleid"], "mod");
        assert_eq!(value["fileid"], "file22");
        assert_eq!(value["language"], "en");
        assert_eq!(value["boost"], 8323.3);
        assert_eq!(value["searchablestrings"]["weight0"], "sometext");
        assert_eq!(value["searchablestrings"]["weight3"], "othertext");
        assert_eq!(value["filemetadata"]["type"], "doc");
        assert_eq!(value["filemetadata"]["imageuri"], "img://a");
        assert!(value["filemetadata"].get("title").is_none());
    }

    #[test]
    fn test_filetype_alias() {
        let json = r#"{
            "moduleid": "m", "fileid": "f", "language": "en", "boost": 1.0,
            "searchablestrings": {"weight1": "x"},
            "filemetadata": {"filetype": "pdf", "title": "T"}
        }"#;
        let d: WorkDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.metadata.display_type.as_deref(), Some("pdf"));
        assert_eq!(d.metadata.title.as_deref(), Some("T"));
        assert_eq!(d.text(WeightSlot::Weight1), Some("x"));
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_text() {
        let d = WorkDescriptor::new("m", "f", "en", 1.0)
            .with_text(WeightSlot::Weight0, "")
            .with_text(WeightSlot::Weight2, "");
        assert!(matches!(d.validate(), Err(DescriptorError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_path_ids() {
        let d = WorkDescriptor::new("../etc", "f", "en", 1.0)
            .with_text(WeightSlot::Weight0, "text");
        assert!(matches!(d.validate(), Err(DescriptorError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_negative_boost() {
        let d =
            WorkDescriptor::new("m", "f", "en", -1.0).with_text(WeightSlot::Weight0, "t");
        assert!(matches!(d.validate(), Err(DescriptorError::Validation(_))));
    }
}
