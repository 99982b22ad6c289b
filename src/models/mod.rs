use serde::{Deserialize, Serialize};

/// One line of the metadata log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Fields we don't know about survive a rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MetadataRecord {
    pub fn new(
        file_name: impl Into<String>,
        text: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
            source_file: Some(source_file.into()),
            extra: serde_json::Map::new(),
        }
    }
}

/// A `file_name` -> `text` row of the caption table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionRow {
    pub file_name: String,
    pub text: String,
}
