//! Decision weights and risk thresholds.
//!
//! The backend stores these as YAML; the client accepts YAML or JSON files and
//! validates them against an embedded JSON Schema before upload.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ConfigError;

/// Embedded weight config schema (loaded at compile time).
const WEIGHT_SCHEMA_JSON: &str = include_str!("../../schema/weight_config.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Weights the sum check tolerates.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionWeights {
    pub static_weight: f64,
    pub dynamic_weight: f64,

    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self {
            static_weight: 0.6,
            dynamic_weight: 0.4,
            extra: BTreeMap::new(),
        }
    }
}

/// Score thresholds for the WARNING and TERMINATE verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub terminate: f64,
    pub warning: f64,

    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            terminate: 75.0,
            warning: 40.0,
            extra: BTreeMap::new(),
        }
    }
}

/// The backend's `weight_config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    #[serde(default)]
    pub decision_engine: DecisionWeights,

    #[serde(default)]
    pub risk_levels: RiskThresholds,

    /// Other sections, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl WeightConfig {
    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load from a file, choosing the format by extension (YAML unless `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Validate a raw value against the schema, then decode and check it.
    pub fn from_value(value: JsonValue) -> Result<Self, ConfigError> {
        validate_weight_schema(&value).map_err(ConfigError::Schema)?;
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = &self.decision_engine;
        let sum = weights.static_weight + weights.dynamic_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "static_weight + dynamic_weight must equal 1.0, got {sum}"
            )));
        }

        let levels = &self.risk_levels;
        if levels.warning >= levels.terminate {
            return Err(ConfigError::Invalid(format!(
                "warning threshold ({}) must be below terminate threshold ({})",
                levels.warning, levels.terminate
            )));
        }

        Ok(())
    }
}

/// Get or initialize the compiled schema validator.
fn get_validator() -> Result<&'static jsonschema::Validator, ConfigError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: JsonValue = match serde_json::from_str(WEIGHT_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::SchemaUnavailable(e.clone())),
    }
}

/// Validate a weight config value against the schema.
///
/// Returns every violation, each prefixed with its instance path.
pub fn validate_weight_schema(value: &JsonValue) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{}: {}", e.instance_path, e))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
