//! Backend configuration payloads: risk rules, decision weights, knowledge base.
//!
//! The client edits these remotely, so each type keeps unknown fields and
//! validates locally before anything is uploaded.

mod knowledge;
mod rules;
mod weights;

use thiserror::Error;

pub use knowledge::{validate_knowledge_filename, KnowledgeBase, KnowledgeFile};
pub use rules::{RiskRuleSet, RiskRuleSpec, MAX_RISK_VALUE};
pub use weights::{validate_weight_schema, DecisionWeights, RiskThresholds, WeightConfig};

/// Errors from loading or validating configuration payloads.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Schema validation failed: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
