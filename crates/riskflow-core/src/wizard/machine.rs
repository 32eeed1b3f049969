//! The step transition table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::WizardStep;

/// A primary user action. Each one has a designated source step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardAction {
    SubmitStaticScan,
    RequestTactics,
    SubmitUserResponse,
    Reset,
}

impl WizardAction {
    pub const ALL: [WizardAction; 4] = [
        WizardAction::SubmitStaticScan,
        WizardAction::RequestTactics,
        WizardAction::SubmitUserResponse,
        WizardAction::Reset,
    ];

    /// The step this action is valid from, or `None` if valid from any step.
    pub fn source_step(self) -> Option<WizardStep> {
        match self {
            Self::SubmitStaticScan => Some(WizardStep::Input),
            Self::RequestTactics => Some(WizardStep::Tactics),
            Self::SubmitUserResponse => Some(WizardStep::Response),
            Self::Reset => None,
        }
    }

    /// Whether this action goes through the analysis service.
    pub fn may_call_service(self) -> bool {
        !matches!(self, Self::Reset)
    }
}

impl fmt::Display for WizardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SubmitStaticScan => "submit_static_scan",
            Self::RequestTactics => "request_tactics",
            Self::SubmitUserResponse => "submit_user_response",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

impl WizardStep {
    /// Target step for a successful `action` taken from this step.
    ///
    /// Returns `None` when the action is not valid here. Failed actions never
    /// reach this table: they are self-loops.
    pub fn transition(self, action: WizardAction) -> Option<WizardStep> {
        use WizardAction as A;
        use WizardStep as S;

        match (self, action) {
            (S::Input, A::SubmitStaticScan) => Some(S::Tactics),
            (S::Tactics, A::RequestTactics) => Some(S::Response),
            (S::Response, A::SubmitUserResponse) => Some(S::Result),
            (_, A::Reset) => Some(S::Input),
            _ => None,
        }
    }

    /// Whether `action` is accepted from this step.
    pub fn accepts(self, action: WizardAction) -> bool {
        self.transition(action).is_some()
    }
}
