//! Keyword risk rules as stored by the backend (`risk_rules.json`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ConfigError;

/// Highest risk value a single rule may carry; scores are capped at 100.
pub const MAX_RISK_VALUE: f64 = 100.0;

/// One keyword rule. The backend keys its fields in Chinese.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskRuleSpec {
    /// Words that trigger the rule
    #[serde(rename = "触发词", default)]
    pub trigger_words: Vec<String>,

    /// Points added to the static score when triggered
    #[serde(rename = "风险值", default)]
    pub risk_value: f64,

    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

/// All configured rules, by rule name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskRuleSet {
    pub rules: BTreeMap<String, RiskRuleSpec>,
}

impl RiskRuleSet {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let set: Self = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check every rule has a name, at least one trigger word and a sane value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rule) in &self.rules {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("rule name must not be empty".into()));
            }
            if rule.trigger_words.iter().all(|w| w.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "rule '{name}' has no trigger words"
                )));
            }
            if !(0.0..=MAX_RISK_VALUE).contains(&rule.risk_value) {
                return Err(ConfigError::Invalid(format!(
                    "rule '{name}' risk value {} is outside 0..={MAX_RISK_VALUE}",
                    rule.risk_value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_rules() {
        let json = r#"{
            "高收入": {"触发词": ["年薪", "月薪"], "风险值": 30, "说明": "收入夸大"},
            "无医保": {"触发词": ["无医保"], "风险值": 20}
        }"#;
        let set = RiskRuleSet::from_json(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.rules["高收入"].risk_value, 30.0);
        assert!(set.rules["高收入"].extra.contains_key("说明"));

        let back = serde_json::to_value(&set).unwrap();
        assert_eq!(back["无医保"]["触发词"][0], "无医保");
    }

    #[test]
    fn test_rule_without_triggers_rejected() {
        let json = r#"{"空规则": {"触发词": [" "], "风险值": 10}}"#;
        assert!(matches!(
            RiskRuleSet::from_json(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_risk_value_range() {
        let json = r#"{"r": {"触发词": ["x"], "风险值": 140}}"#;
        assert!(RiskRuleSet::from_json(json).is_err());
    }
}
