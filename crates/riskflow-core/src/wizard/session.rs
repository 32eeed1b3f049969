//! Session state: the current step and the data it is rendered from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::machine::WizardAction;
use super::plan::StepError;
use crate::types::{AnalysisResult, WizardStep};

/// A completed step change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: WizardStep,
    pub to: WizardStep,
    pub action: WizardAction,
    pub at: DateTime<Utc>,
}

/// Read-only copy of a session, safe to hand to a renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub step: WizardStep,
    pub input_text: String,
    pub user_response: String,
    pub result: Option<AnalysisResult>,
}

/// One analysis session.
///
/// # Invariants
/// - `step` and `result` only change together, through [`Session::advance`]
///   or [`Session::reset`].
/// - Any step other than `Input` has a result.
#[derive(Debug, Clone, Default)]
pub struct Session {
    step: WizardStep,
    input_text: String,
    user_response: String,
    result: Option<AnalysisResult>,
    history: Vec<Transition>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn user_response(&self) -> &str {
        &self.user_response
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Transitions taken since the session started or was last reset.
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            step: self.step,
            input_text: self.input_text.clone(),
            user_response: self.user_response.clone(),
            result: self.result.clone(),
        }
    }

    /// Edit the profile text. Only allowed while on the input step.
    pub fn set_input_text(&mut self, text: impl Into<String>) -> Result<(), StepError> {
        if self.step != WizardStep::Input {
            return Err(StepError::OutOfOrder {
                action: WizardAction::SubmitStaticScan,
                step: self.step,
            });
        }
        self.input_text = text.into();
        Ok(())
    }

    /// Edit the counterpart response. Only allowed while on the response step.
    pub fn set_user_response(&mut self, text: impl Into<String>) -> Result<(), StepError> {
        if self.step != WizardStep::Response {
            return Err(StepError::OutOfOrder {
                action: WizardAction::SubmitUserResponse,
                step: self.step,
            });
        }
        self.user_response = text.into();
        Ok(())
    }

    /// Check that `action` may start from the current step.
    pub fn check(&self, action: WizardAction) -> Result<WizardStep, StepError> {
        self.step.transition(action).ok_or(StepError::OutOfOrder {
            action,
            step: self.step,
        })
    }

    /// Apply a successful `action`, replacing the result when one is given.
    ///
    /// Passing `None` keeps the current result. Nothing is modified when an
    /// error is returned.
    pub fn advance(
        &mut self,
        action: WizardAction,
        result: Option<AnalysisResult>,
    ) -> Result<Transition, StepError> {
        let to = self.check(action)?;
        if to.requires_result() && result.is_none() && self.result.is_none() {
            return Err(StepError::MissingResult { step: to });
        }

        let transition = Transition {
            from: self.step,
            to,
            action,
            at: Utc::now(),
        };

        tracing::debug!(from = %self.step, to = %to, action = %action, "wizard transition");

        if let Some(result) = result {
            self.result = Some(result);
        }
        self.step = to;
        self.history.push(transition.clone());

        Ok(transition)
    }

    /// Clear both texts and the result, and return to the input step.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
