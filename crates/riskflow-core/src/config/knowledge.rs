//! Knowledge base listings and uploads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ConfigError;
use crate::types::null_as_default;

/// Summary of one CSV file in the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeFile {
    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub rows: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<String>,

    /// First few rows, keyed by column
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<BTreeMap<String, JsonValue>>,
}

/// `data` of the knowledge-base listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default, deserialize_with = "null_as_default")]
    pub knowledge_files: BTreeMap<String, KnowledgeFile>,
}

/// Check a file name is acceptable for upload. Only CSV is accepted.
pub fn validate_knowledge_filename(filename: &str) -> Result<(), ConfigError> {
    let lower = filename.to_ascii_lowercase();
    if filename.trim().is_empty() || !lower.ends_with(".csv") || lower == ".csv" {
        return Err(ConfigError::Invalid(format!(
            "knowledge files must be .csv, got '{filename}'"
        )));
    }
    Ok(())
}
