//! Local checks that run before any call to the analysis service.

use std::fmt;

use thiserror::Error;

use super::machine::WizardAction;
use crate::types::{AiAnalysis, AnalysisResult, TriggeredRule, WizardStep};

/// A user-editable text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    InputText,
    UserResponse,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputText => f.write_str("input text"),
            Self::UserResponse => f.write_str("user response"),
        }
    }
}

/// Why a wizard action was refused before reaching the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("{field} must not be empty")]
    EmptyInput { field: Field },

    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),

    #[error("Action {action} is not valid in step {step}")]
    OutOfOrder {
        action: WizardAction,
        step: WizardStep,
    },

    #[error("Step {step} cannot be entered without an analysis result")]
    MissingResult { step: WizardStep },
}

/// Trim `text` and reject it if nothing is left.
pub fn validate_required(field: Field, text: &str) -> Result<&str, StepError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StepError::EmptyInput { field });
    }
    Ok(trimmed)
}

/// What `request_tactics` has to do for a given result.
#[derive(Debug, Clone, PartialEq)]
pub enum TacticsPlan {
    /// Tactics are already present; advance without a call.
    Reuse,

    /// Ask the service to expand the AI suggestions into tactics.
    Generate {
        rules: Vec<TriggeredRule>,
        ai_analysis: AiAnalysis,
    },

    /// Nothing to generate tactics from.
    Unavailable,
}

impl TacticsPlan {
    pub fn needs_call(&self) -> bool {
        matches!(self, Self::Generate { .. })
    }
}

/// Decide how to obtain verification tactics for `result`.
pub fn plan_tactics(result: &AnalysisResult) -> TacticsPlan {
    if result.has_tactics() {
        return TacticsPlan::Reuse;
    }

    match result.effective_ai_analysis() {
        Some(ai) if ai.verification_suggestions.is_some() => TacticsPlan::Generate {
            rules: result.triggered_rules().to_vec(),
            ai_analysis: ai.clone(),
        },
        _ => TacticsPlan::Unavailable,
    }
}
