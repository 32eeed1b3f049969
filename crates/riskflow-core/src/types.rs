//! Data model shared by the wizard and the gateway client.
//!
//! The backend returns loosely-typed JSON whose fields come and go depending on
//! which endpoint produced it. Every field here is optional or defaults when
//! absent (or `null`), so a payload from any endpoint decodes into the same
//! [`AnalysisResult`] and each renderer can check presence exhaustively.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Rule name the backend uses for raw AI suggestions folded into the tactic list.
///
/// These entries duplicate `ai_analysis.verification_suggestions` and are not
/// shown as tactics.
pub const AI_SUGGESTION_RULE_NAME: &str = "AI智能建议";

/// Decode `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The current step of the analysis wizard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    /// Entering the free-text profile.
    #[default]
    Input,
    /// Reviewing the static scan and AI hints.
    Tactics,
    /// Entering the counterpart's response.
    Response,
    /// Viewing the composite decision.
    Result,
}

impl WizardStep {
    /// All steps in display order.
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Input,
        WizardStep::Tactics,
        WizardStep::Response,
        WizardStep::Result,
    ];

    /// 1-based position in the step indicator.
    pub fn ordinal(self) -> usize {
        match self {
            Self::Input => 1,
            Self::Tactics => 2,
            Self::Response => 3,
            Self::Result => 4,
        }
    }

    /// Label shown in the step indicator.
    pub fn label(self) -> &'static str {
        match self {
            Self::Input => "Enter profile",
            Self::Tactics => "Generate tactics",
            Self::Response => "Counterpart response",
            Self::Result => "Analysis result",
        }
    }

    /// Whether this step may only be shown with an analysis result present.
    pub fn requires_result(self) -> bool {
        !matches!(self, Self::Input)
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Tactics => "tactics",
            Self::Response => "response",
            Self::Result => "result",
        };
        f.write_str(name)
    }
}

/// How a rule was detected by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DetectionMethod {
    KeywordMatch,
    AiAnalysis,
    PatternAnalysis,
    Other(String),
}

impl From<String> for DetectionMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "keyword_match" => Self::KeywordMatch,
            "ai_analysis" => Self::AiAnalysis,
            "pattern_analysis" => Self::PatternAnalysis,
            _ => Self::Other(value),
        }
    }
}

impl From<DetectionMethod> for String {
    fn from(value: DetectionMethod) -> Self {
        match value {
            DetectionMethod::KeywordMatch => "keyword_match".to_string(),
            DetectionMethod::AiAnalysis => "ai_analysis".to_string(),
            DetectionMethod::PatternAnalysis => "pattern_analysis".to_string(),
            DetectionMethod::Other(other) => other,
        }
    }
}

impl DetectionMethod {
    /// Short tag for display.
    pub fn tag(&self) -> &str {
        match self {
            Self::KeywordMatch => "keyword",
            Self::AiAnalysis => "AI",
            Self::PatternAnalysis => "pattern",
            Self::Other(other) => other,
        }
    }
}

/// A rule the backend reports as triggered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRule {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rule_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_value: Option<f64>,

    /// Keywords that matched, for keyword rules
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_method: Option<DetectionMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Configured rule an AI-detected rule was mapped onto
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,

    /// Fields this client does not model, kept so rules round-trip to the backend
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

/// Priority of a verification tactic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TacticPriority {
    High,
    #[default]
    Medium,
    Low,
    Other(String),
}

impl From<String> for TacticPriority {
    fn from(value: String) -> Self {
        match value.as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Other(value),
        }
    }
}

impl From<TacticPriority> for String {
    fn from(value: TacticPriority) -> Self {
        match value {
            TacticPriority::High => "high".to_string(),
            TacticPriority::Medium => "medium".to_string(),
            TacticPriority::Low => "low".to_string(),
            TacticPriority::Other(other) => other,
        }
    }
}

impl fmt::Display for TacticPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high priority"),
            Self::Medium => f.write_str("medium priority"),
            Self::Low => f.write_str("low priority"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// A suggested verification question to pose to the counterpart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationTactic {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rule_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: TacticPriority,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tactic: String,

    /// Background note explaining the tactic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<String>,
}

impl VerificationTactic {
    /// Whether this entry is a raw AI suggestion rather than a generated tactic.
    pub fn is_ai_suggestion(&self) -> bool {
        self.rule_name == AI_SUGGESTION_RULE_NAME
    }
}

/// The backend's verdict on the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Pass,
    Warning,
    Terminate,
    Error,
    Other(String),
}

impl From<String> for Verdict {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PASS" => Self::Pass,
            "WARNING" => Self::Warning,
            "TERMINATE" => Self::Terminate,
            "ERROR" => Self::Error,
            _ => Self::Other(value),
        }
    }
}

impl From<Verdict> for String {
    fn from(value: Verdict) -> Self {
        match value {
            Verdict::Pass => "PASS".to_string(),
            Verdict::Warning => "WARNING".to_string(),
            Verdict::Terminate => "TERMINATE".to_string(),
            Verdict::Error => "ERROR".to_string(),
            Verdict::Other(other) => other,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// Composite decision combining static and dynamic scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Verdict>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminate_threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_threshold: Option<f64>,
}

/// AI reasoning attached to a static scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub risk_reasons: Vec<String>,

    /// Hints the tactic generator expands into full tactics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_suggestions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub ai_rules: Vec<TriggeredRule>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl AiAnalysis {
    /// Suggestions, if any were produced.
    pub fn suggestions(&self) -> Option<&[String]> {
        self.verification_suggestions
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}

/// Static scan nested inside a full-analysis payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticScanSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<TriggeredRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rules: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
}

/// Scores from analysing the counterpart's response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzzy_evasion: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_attack: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_shift: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precise_answer: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub risk_tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_risk_score: Option<f64>,
}

/// Whatever the backend returned for the last completed step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<TriggeredRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rules: Option<u32>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub verification_tactics: Vec<VerificationTactic>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub evidence_chain: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_scan: Option<StaticScanSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_session: Option<DynamicSession>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl AnalysisResult {
    /// Whether generated tactics are already present.
    pub fn has_tactics(&self) -> bool {
        !self.verification_tactics.is_empty()
    }

    /// AI verification suggestions, looking into a nested static scan if needed.
    pub fn verification_suggestions(&self) -> Option<&[String]> {
        self.effective_ai_analysis().and_then(AiAnalysis::suggestions)
    }

    /// The AI analysis, top-level first, then the nested static scan's.
    pub fn effective_ai_analysis(&self) -> Option<&AiAnalysis> {
        self.ai_analysis.as_ref().or_else(|| {
            self.static_scan
                .as_ref()
                .and_then(|scan| scan.ai_analysis.as_ref())
        })
    }

    /// Triggered rules, top-level first, then the nested static scan's.
    pub fn triggered_rules(&self) -> &[TriggeredRule] {
        if !self.rules.is_empty() {
            return &self.rules;
        }
        self.static_scan
            .as_ref()
            .map(|scan| scan.rules.as_slice())
            .unwrap_or(&[])
    }

    /// Number of triggered rules as reported, falling back to counting them.
    pub fn rule_count(&self) -> usize {
        self.total_rules
            .or_else(|| self.static_scan.as_ref().and_then(|s| s.total_rules))
            .map(|n| n as usize)
            .unwrap_or_else(|| self.triggered_rules().len())
    }

    /// Static-only score.
    pub fn static_score(&self) -> Option<f64> {
        self.static_scan
            .as_ref()
            .and_then(|scan| scan.score)
            .or(self.score)
    }

    /// The headline score: the decision total if decided, else the static score.
    pub fn headline_score(&self) -> Option<f64> {
        self.decision
            .as_ref()
            .and_then(|d| d.total_score)
            .or_else(|| self.static_score())
    }

    /// Tactics to present, without raw AI suggestion entries.
    pub fn presentable_tactics(&self) -> impl Iterator<Item = &VerificationTactic> {
        self.verification_tactics
            .iter()
            .filter(|t| !t.is_ai_suggestion())
    }

    /// Backend timestamp, if present and parseable.
    ///
    /// The backend emits naive ISO-8601 local time, with or without fractional
    /// seconds.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }
}

/// A `success: false` envelope from the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApplicationError {
    pub message: String,
}

impl ApplicationError {
    /// Message used when the backend rejects a request without saying why.
    pub const UNSPECIFIED: &'static str = "request rejected by analysis service";
}

/// The uniform `{success, data, message?}` wrapper around every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub data: T,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Wrap a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    /// Unwrap the payload, turning `success: false` into an [`ApplicationError`].
    pub fn into_result(self) -> Result<T, ApplicationError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApplicationError {
                message: self
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| ApplicationError::UNSPECIFIED.to_string()),
            })
        }
    }
}

/// Response of the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}
