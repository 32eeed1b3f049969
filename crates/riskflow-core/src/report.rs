//! Render-ready views over an [`AnalysisResult`].
//!
//! Renderers should not reach into the optional fields themselves: the views
//! here apply the fallbacks once (decision score before static score, default
//! weights when the backend omits them, placeholder evidence).

use serde::Serialize;

use crate::types::{
    AiAnalysis, AnalysisResult, TriggeredRule, Verdict, VerificationTactic, WizardStep,
};

/// Default static weight when the decision omits it.
pub const DEFAULT_STATIC_WEIGHT: f64 = 0.6;

/// Default dynamic weight when the decision omits it.
pub const DEFAULT_DYNAMIC_WEIGHT: f64 = 0.4;

/// Scores at or above this are high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 75.0;

/// Scores at or above this are medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 40.0;

/// Evidence shown when the backend returns none.
pub const FALLBACK_EVIDENCE: &str = "Assessment based on static scan results";

/// Coarse risk band derived from a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low risk",
            Self::Medium => "medium risk",
            Self::High => "high risk",
        }
    }
}

/// What the tactics step shows: the static scan and the AI hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanView<'a> {
    pub score: f64,
    pub band: RiskBand,
    pub rule_count: usize,
    pub rules: &'a [TriggeredRule],
    pub ai_analysis: Option<&'a AiAnalysis>,
}

impl<'a> ScanView<'a> {
    pub fn new(result: &'a AnalysisResult) -> Self {
        let score = result.static_score().unwrap_or(0.0);
        Self {
            score,
            band: RiskBand::from_score(score),
            rule_count: result.rule_count(),
            rules: result.triggered_rules(),
            ai_analysis: result.effective_ai_analysis(),
        }
    }
}

/// What the result step shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionView<'a> {
    pub total_score: f64,
    /// Backend's own risk label when given, else the local band label
    pub risk_level: String,
    pub verdict: Option<Verdict>,
    pub static_score: f64,
    pub dynamic_score: f64,
    pub static_weight: f64,
    pub dynamic_weight: f64,
    pub evidence: Vec<&'a str>,
    pub tactics: Vec<&'a VerificationTactic>,
}

impl<'a> DecisionView<'a> {
    pub fn new(result: &'a AnalysisResult) -> Self {
        let decision = result.decision.as_ref();
        let total_score = result.headline_score().unwrap_or(0.0);

        let risk_level = decision
            .and_then(|d| d.risk_level.clone())
            .unwrap_or_else(|| RiskBand::from_score(total_score).label().to_string());

        let evidence = if result.evidence_chain.is_empty() {
            vec![FALLBACK_EVIDENCE]
        } else {
            result.evidence_chain.iter().map(String::as_str).collect()
        };

        Self {
            total_score,
            risk_level,
            verdict: decision.and_then(|d| d.decision.clone()),
            static_score: result.static_score().unwrap_or(0.0),
            dynamic_score: decision.and_then(|d| d.dynamic_score).unwrap_or(0.0),
            static_weight: decision
                .and_then(|d| d.static_weight)
                .unwrap_or(DEFAULT_STATIC_WEIGHT),
            dynamic_weight: decision
                .and_then(|d| d.dynamic_weight)
                .unwrap_or(DEFAULT_DYNAMIC_WEIGHT),
            evidence,
            tactics: result.presentable_tactics().collect(),
        }
    }
}

/// A step paired with the view it renders.
///
/// Steps after `Input` are only constructible with a result, so a renderer
/// matching on this enum can never draw them empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum StepView<'a> {
    Input,
    Tactics(ScanView<'a>),
    Response { tactics: Vec<&'a VerificationTactic> },
    Result(DecisionView<'a>),
}

impl<'a> StepView<'a> {
    /// Build the view for `step`, or `None` when a required result is absent.
    pub fn new(step: WizardStep, result: Option<&'a AnalysisResult>) -> Option<Self> {
        match (step, result) {
            (WizardStep::Input, _) => Some(Self::Input),
            (WizardStep::Tactics, Some(r)) => Some(Self::Tactics(ScanView::new(r))),
            (WizardStep::Response, Some(r)) => Some(Self::Response {
                tactics: r.presentable_tactics().collect(),
            }),
            (WizardStep::Result, Some(r)) => Some(Self::Result(DecisionView::new(r))),
            (_, None) => None,
        }
    }
}
