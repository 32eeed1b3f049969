//! The four-step analysis wizard.
//!
//! ```text
//! Input --submit_static_scan--> Tactics --request_tactics--> Response
//!   ^                                                           |
//!   +---------- reset ---------- Result <--submit_user_response-+
//! ```
//!
//! Failed actions are self-loops. This module is pure: it decides what is
//! allowed and records what happened, and the runtime controller performs the
//! service calls in between.

mod machine;
mod plan;
mod session;

pub use machine::WizardAction;
pub use plan::{plan_tactics, validate_required, Field, StepError, TacticsPlan};
pub use session::{Session, SessionSnapshot, Transition};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisResult, WizardStep};
    use proptest::prelude::*;

    fn any_step() -> impl Strategy<Value = WizardStep> {
        prop::sample::select(WizardStep::ALL.to_vec())
    }

    fn any_action() -> impl Strategy<Value = WizardAction> {
        prop::sample::select(WizardAction::ALL.to_vec())
    }

    /// Drive a session to `step` through the forward path.
    fn session_at(step: WizardStep) -> Session {
        let mut session = Session::new();
        let path = [
            WizardAction::SubmitStaticScan,
            WizardAction::RequestTactics,
            WizardAction::SubmitUserResponse,
        ];
        for action in path.iter().take(step.ordinal() - 1) {
            session
                .advance(*action, Some(AnalysisResult::default()))
                .unwrap();
        }
        session
    }

    proptest! {
        #[test]
        fn whitespace_is_never_valid_input(ws in "[ \t\r\n]{0,16}") {
            prop_assert!(validate_required(Field::InputText, &ws).is_err());
            prop_assert!(validate_required(Field::UserResponse, &ws).is_err());
        }

        #[test]
        fn rejected_actions_leave_session_unchanged(step in any_step(), action in any_action()) {
            let mut session = session_at(step);
            prop_assert_eq!(session.step(), step);
            let before = session.snapshot();

            let outcome = session
                .advance(action, Some(AnalysisResult::default()))
                .map(|transition| transition.to);
            match outcome {
                Ok(to) => prop_assert_eq!(Some(to), step.transition(action)),
                Err(_) => {
                    prop_assert_eq!(step.transition(action), None);
                    prop_assert_eq!(session.snapshot(), before);
                }
            }
        }

        #[test]
        fn non_input_steps_always_have_a_result(actions in prop::collection::vec(any_action(), 0..24)) {
            let mut session = Session::new();
            for action in actions {
                let _ = session.advance(action, Some(AnalysisResult::default()));
                if session.step().requires_result() {
                    prop_assert!(session.result().is_some());
                }
            }
        }
    }
}
