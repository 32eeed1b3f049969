//! Async wizard controller.
//!
//! The controller drives one [`Session`] through the four steps, calling the
//! analysis service where a step needs it:
//! - Local checks (step order, empty input) run before any request
//! - At most one request is in flight at a time
//! - Step, texts and result are committed together once a request succeeds
//! - A reset while a request is in flight discards that request's result

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

use riskflow_core::{
    plan_tactics, validate_required, AnalysisResult, Field, Session, SessionSnapshot, StepError,
    TacticsPlan, Transition, WizardAction, WizardStep,
};

use crate::gateway::{AnalysisGateway, FailureKind, GatewayError};

/// Errors from wizard operations.
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("{field} is required")]
    Validation { field: Field },

    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),

    #[error("Action {action} is not valid in step {step}")]
    OutOfOrder {
        action: WizardAction,
        step: WizardStep,
    },

    #[error("Another request is already in progress")]
    Busy,

    #[error("Session was reset while the request was in flight")]
    Superseded,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<StepError> for WizardError {
    fn from(error: StepError) -> Self {
        match error {
            StepError::EmptyInput { field } => Self::Validation { field },
            StepError::MissingPrecondition(reason) => Self::MissingPrecondition(reason),
            StepError::OutOfOrder { action, step } => Self::OutOfOrder { action, step },
            StepError::MissingResult { step } => {
                Self::MissingPrecondition(format!("no analysis result for step {step}"))
            }
        }
    }
}

impl WizardError {
    /// Whether the user can retry the same action unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Busy => true,
            Self::Gateway(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Message suitable for showing next to the triggering control.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { field } => format!("Please enter the {field}."),
            Self::MissingPrecondition(reason) => format!("Cannot continue: {reason}."),
            Self::OutOfOrder { action, step } => {
                format!("'{action}' is not available on the {} step.", step.label())
            }
            Self::Busy => "A request is already running, please wait.".to_string(),
            Self::Superseded => "The session was reset; the earlier request was discarded."
                .to_string(),
            Self::Gateway(e) => match e.kind() {
                FailureKind::Timeout => {
                    "The analysis service took too long to answer. Please try again.".to_string()
                }
                FailureKind::Application => format!("The analysis failed: {e}"),
                FailureKind::Transport => {
                    format!("Could not reach the analysis service, please try again: {e}")
                }
                FailureKind::Local => format!("The request was not sent: {e}"),
            },
        }
    }
}

/// Session plus a counter bumped on every reset.
#[derive(Debug, Default)]
struct State {
    session: Session,
    epoch: u64,
}

/// Clears the in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives the risk questionnaire against an [`AnalysisGateway`].
///
/// # Concurrency
/// The session lock is never held across a request. Each operation reads
/// what it needs, releases the lock, awaits the service, then re-locks to
/// commit. A commit whose epoch no longer matches (the session was reset in
/// between) is dropped with [`WizardError::Superseded`].
pub struct WizardController {
    gateway: Arc<dyn AnalysisGateway>,
    state: Mutex<State>,
    in_flight: AtomicBool,
    updates: watch::Sender<SessionSnapshot>,
}

impl WizardController {
    /// Create a controller with a fresh session.
    pub fn new(gateway: Arc<dyn AnalysisGateway>) -> Self {
        Self::with_session(gateway, Session::new())
    }

    fn with_session(gateway: Arc<dyn AnalysisGateway>, session: Session) -> Self {
        let (updates, _) = watch::channel(session.snapshot());
        Self {
            gateway,
            state: Mutex::new(State { session, epoch: 0 }),
            in_flight: AtomicBool::new(false),
            updates,
        }
    }

    /// Current step.
    pub fn step(&self) -> WizardStep {
        self.state.lock().session.step()
    }

    /// Immutable copy of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().session.snapshot()
    }

    /// Transitions taken since the last reset.
    pub fn history(&self) -> Vec<Transition> {
        self.state.lock().session.history().to_vec()
    }

    /// Whether a request is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Receive a snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Stage the profile text while on the input step.
    pub fn set_input_text(&self, text: impl Into<String>) -> Result<(), WizardError> {
        self.edit(|session| session.set_input_text(text))
    }

    /// Stage the counterpart response while on the response step.
    pub fn set_user_response(&self, text: impl Into<String>) -> Result<(), WizardError> {
        self.edit(|session| session.set_user_response(text))
    }

    /// Run a static scan of `input_text` and move to the tactics step.
    pub async fn submit_static_scan(
        &self,
        input_text: &str,
    ) -> Result<SessionSnapshot, WizardError> {
        let action = WizardAction::SubmitStaticScan;
        let _guard = self.begin(action)?;

        let (epoch, text) = {
            let state = self.state.lock();
            state.session.check(action)?;
            let text = validate_required(Field::InputText, input_text)?.to_string();
            (state.epoch, text)
        };

        let result = self.gateway.static_scan(&text).await?;
        tracing::info!(
            gateway = self.gateway.name(),
            score = ?result.headline_score(),
            rules = result.rule_count(),
            "Static scan completed"
        );

        self.commit(epoch, action, Some(result), move |session| {
            session.set_input_text(text)
        })
    }

    /// Obtain verification tactics and move to the response step.
    ///
    /// Tactics already present in the result are reused without a request.
    pub async fn request_tactics(&self) -> Result<SessionSnapshot, WizardError> {
        let action = WizardAction::RequestTactics;
        let _guard = self.begin(action)?;

        let (epoch, plan, text) = {
            let state = self.state.lock();
            state.session.check(action)?;
            let result = state.session.result().ok_or_else(|| {
                WizardError::MissingPrecondition("no analysis result".to_string())
            })?;
            (
                state.epoch,
                plan_tactics(result),
                state.session.input_text().to_string(),
            )
        };

        match plan {
            TacticsPlan::Reuse => {
                tracing::debug!("Reusing tactics from the static scan");
                self.commit(epoch, action, None, |_| Ok(()))
            }
            TacticsPlan::Generate { rules, ai_analysis } => {
                let result = self
                    .gateway
                    .generate_tactics(&text, &rules, &ai_analysis)
                    .await?;
                tracing::info!(
                    gateway = self.gateway.name(),
                    tactics = result.verification_tactics.len(),
                    "Tactics generated"
                );
                self.commit(epoch, action, Some(result), |_| Ok(()))
            }
            TacticsPlan::Unavailable => Err(WizardError::MissingPrecondition(
                "no AI verification suggestions to build tactics from".to_string(),
            )),
        }
    }

    /// Run the full analysis with both texts and move to the result step.
    pub async fn submit_user_response(
        &self,
        user_response: &str,
    ) -> Result<SessionSnapshot, WizardError> {
        let action = WizardAction::SubmitUserResponse;
        let _guard = self.begin(action)?;

        let (epoch, input_text, response) = {
            let state = self.state.lock();
            state.session.check(action)?;
            let response = validate_required(Field::UserResponse, user_response)?.to_string();
            (
                state.epoch,
                state.session.input_text().to_string(),
                response,
            )
        };

        let result: AnalysisResult = self.gateway.full_analysis(&input_text, &response).await?;
        tracing::info!(
            gateway = self.gateway.name(),
            verdict = ?result.decision.as_ref().and_then(|d| d.decision.as_ref()),
            total_score = ?result.headline_score(),
            "Full analysis completed"
        );

        self.commit(epoch, action, Some(result), move |session| {
            session.set_user_response(response)
        })
    }

    /// Clear both texts and the result and return to the input step.
    ///
    /// Allowed from any step. A request still in flight keeps the controller
    /// busy until it returns, and its result is then discarded.
    pub fn reset(&self) -> SessionSnapshot {
        let snapshot = {
            let mut state = self.state.lock();
            let from = state.session.step();
            state.session.reset();
            state.epoch += 1;
            tracing::debug!(from = %from, epoch = state.epoch, "Session reset");
            state.session.snapshot()
        };
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    fn begin(&self, action: WizardAction) -> Result<InFlight<'_>, WizardError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                tracing::debug!(action = %action, "Rejected while busy");
                WizardError::Busy
            })?;
        Ok(InFlight(&self.in_flight))
    }

    fn edit<F>(&self, apply: F) -> Result<(), WizardError>
    where
        F: FnOnce(&mut Session) -> Result<(), StepError>,
    {
        let snapshot = {
            let mut state = self.state.lock();
            apply(&mut state.session)?;
            state.session.snapshot()
        };
        self.updates.send_replace(snapshot);
        Ok(())
    }

    /// Apply `stage` and `action` to the session as one change.
    fn commit<F>(
        &self,
        epoch: u64,
        action: WizardAction,
        result: Option<AnalysisResult>,
        stage: F,
    ) -> Result<SessionSnapshot, WizardError>
    where
        F: FnOnce(&mut Session) -> Result<(), StepError>,
    {
        let snapshot = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                tracing::warn!(action = %action, "Discarding result of a reset session");
                return Err(WizardError::Superseded);
            }

            let mut next = state.session.clone();
            stage(&mut next)?;
            next.advance(action, result)?;
            state.session = next;
            state.session.snapshot()
        };

        tracing::debug!(step = ?snapshot.step, "Step committed");
        self.updates.send_replace(snapshot.clone());
        Ok(snapshot)
    }
}

/// Builder for [`WizardController`].
pub struct WizardControllerBuilder {
    gateway: Option<Arc<dyn AnalysisGateway>>,
    input_text: Option<String>,
}

impl WizardControllerBuilder {
    pub fn new() -> Self {
        Self {
            gateway: None,
            input_text: None,
        }
    }

    /// Set the analysis gateway.
    pub fn gateway(mut self, gateway: Arc<dyn AnalysisGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Start on the input step with `text` already staged.
    pub fn input_text(mut self, text: impl Into<String>) -> Self {
        self.input_text = Some(text.into());
        self
    }

    pub fn build(self) -> Result<WizardController, WizardError> {
        let gateway = self.gateway.ok_or_else(|| {
            WizardError::Gateway(GatewayError::NotConfigured("no gateway set".to_string()))
        })?;

        let mut session = Session::new();
        if let Some(text) = self.input_text {
            session.set_input_text(text)?;
        }
        Ok(WizardController::with_session(gateway, session))
    }
}

impl Default for WizardControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use proptest::prelude::*;
    use riskflow_core::{
        AiAnalysis, Decision, DynamicSession, HealthStatus, TriggeredRule, Verdict,
        VerificationTactic,
    };
    use tokio::sync::Notify;

    fn scan_result(suggestions: Option<Vec<&str>>) -> AnalysisResult {
        AnalysisResult {
            score: Some(62.0),
            rules: vec![TriggeredRule {
                rule_name: "high income claim".into(),
                risk_value: Some(30.0),
                ..Default::default()
            }],
            total_rules: Some(1),
            ai_analysis: Some(AiAnalysis {
                verification_suggestions: suggestions
                    .map(|s| s.into_iter().map(String::from).collect()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn tactics_result() -> AnalysisResult {
        AnalysisResult {
            verification_tactics: vec![VerificationTactic {
                rule_name: "high income claim".into(),
                tactic: "Ask which fund they manage".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn full_result() -> AnalysisResult {
        AnalysisResult {
            score: Some(58.0),
            decision: Some(Decision {
                decision: Some(Verdict::Warning),
                total_score: Some(58.0),
                ..Default::default()
            }),
            evidence_chain: vec!["static score 62".into(), "evasive answer".into()],
            ..Default::default()
        }
    }

    /// Gateway returning canned results and counting calls.
    struct MockGateway {
        scan: AnalysisResult,
        calls: AtomicUsize,
        scan_calls: AtomicUsize,
        tactics_calls: AtomicUsize,
        full_calls: AtomicUsize,
        fail_next: Mutex<Option<GatewayError>>,
        gate: Option<Arc<Notify>>,
        last_full: Mutex<Option<(String, String)>>,
    }

    impl MockGateway {
        fn new(scan: AnalysisResult) -> Self {
            Self {
                scan,
                calls: AtomicUsize::new(0),
                scan_calls: AtomicUsize::new(0),
                tactics_calls: AtomicUsize::new(0),
                full_calls: AtomicUsize::new(0),
                fail_next: Mutex::new(None),
                gate: None,
                last_full: Mutex::new(None),
            }
        }

        fn gated(scan: AnalysisResult, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(scan)
            }
        }

        fn fail_next(&self, error: GatewayError) {
            *self.fail_next.lock() = Some(error);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn take_failure(&self) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_next.lock().take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl AnalysisGateway for MockGateway {
        async fn static_scan(&self, _text: &str) -> Result<AnalysisResult, GatewayError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.scan_calls.fetch_add(1, Ordering::SeqCst);
            self.take_failure()?;
            Ok(self.scan.clone())
        }

        async fn generate_tactics(
            &self,
            _text: &str,
            _rules: &[TriggeredRule],
            _ai_analysis: &AiAnalysis,
        ) -> Result<AnalysisResult, GatewayError> {
            self.tactics_calls.fetch_add(1, Ordering::SeqCst);
            self.take_failure()?;
            Ok(tactics_result())
        }

        async fn dynamic_analysis(
            &self,
            _response_text: &str,
        ) -> Result<DynamicSession, GatewayError> {
            self.take_failure()?;
            Ok(DynamicSession::default())
        }

        async fn full_analysis(
            &self,
            input_text: &str,
            user_response: &str,
        ) -> Result<AnalysisResult, GatewayError> {
            self.full_calls.fetch_add(1, Ordering::SeqCst);
            self.take_failure()?;
            *self.last_full.lock() = Some((input_text.to_string(), user_response.to_string()));
            Ok(full_result())
        }

        async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
            Ok(HealthStatus {
                status: "healthy".into(),
                service: Some("mock".into()),
            })
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn controller(gateway: &Arc<MockGateway>) -> WizardController {
        WizardController::new(gateway.clone())
    }

    #[tokio::test]
    async fn test_happy_path_with_generated_tactics() {
        let gateway = Arc::new(MockGateway::new(scan_result(Some(vec!["ask about the fund"]))));
        let wizard = controller(&gateway);

        let snapshot = wizard.submit_static_scan("  男，1988，某私募MD ").await.unwrap();
        assert_eq!(snapshot.step, WizardStep::Tactics);
        assert_eq!(snapshot.input_text, "男，1988，某私募MD");
        assert_eq!(snapshot.result.as_ref().and_then(|r| r.score), Some(62.0));

        let snapshot = wizard.request_tactics().await.unwrap();
        assert_eq!(snapshot.step, WizardStep::Response);
        assert_eq!(gateway.tactics_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            snapshot.result.as_ref().map(|r| r.verification_tactics.len()),
            Some(1)
        );

        let snapshot = wizard.submit_user_response("我管的是量化基金").await.unwrap();
        assert_eq!(snapshot.step, WizardStep::Result);
        assert_eq!(snapshot.user_response, "我管的是量化基金");
        assert_eq!(
            snapshot.result.as_ref().and_then(|r| r.decision.as_ref()).and_then(|d| d.decision.clone()),
            Some(Verdict::Warning)
        );
        assert_eq!(
            gateway.last_full.lock().clone(),
            Some(("男，1988，某私募MD".to_string(), "我管的是量化基金".to_string()))
        );

        let steps: Vec<_> = wizard.history().iter().map(|t| t.to).collect();
        assert_eq!(
            steps,
            vec![WizardStep::Tactics, WizardStep::Response, WizardStep::Result]
        );
        assert_eq!(gateway.calls(), 3);
    }

    #[tokio::test]
    async fn test_existing_tactics_are_reused() {
        let mut scan = scan_result(None);
        scan.verification_tactics = tactics_result().verification_tactics;
        let gateway = Arc::new(MockGateway::new(scan));
        let wizard = controller(&gateway);

        wizard.submit_static_scan("profile").await.unwrap();
        let snapshot = wizard.request_tactics().await.unwrap();

        assert_eq!(snapshot.step, WizardStep::Response);
        assert_eq!(gateway.tactics_calls.load(Ordering::SeqCst), 0);
        assert_eq!(snapshot.result.as_ref().and_then(|r| r.score), Some(62.0));
    }

    #[tokio::test]
    async fn test_no_suggestions_is_missing_precondition() {
        let gateway = Arc::new(MockGateway::new(scan_result(None)));
        let wizard = controller(&gateway);

        wizard.submit_static_scan("profile").await.unwrap();
        let err = wizard.request_tactics().await.unwrap_err();

        assert!(matches!(err, WizardError::MissingPrecondition(_)));
        assert_eq!(wizard.step(), WizardStep::Tactics);
        assert_eq!(gateway.tactics_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_suggestions_still_generate_tactics() {
        let gateway = Arc::new(MockGateway::new(scan_result(Some(vec![]))));
        let wizard = controller(&gateway);

        wizard.submit_static_scan("profile").await.unwrap();
        let snapshot = wizard.request_tactics().await.unwrap();

        assert_eq!(snapshot.step, WizardStep::Response);
        assert_eq!(gateway.tactics_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_tactics_twice_is_rejected() {
        let mut scan = scan_result(None);
        scan.verification_tactics = tactics_result().verification_tactics;
        let gateway = Arc::new(MockGateway::new(scan));
        let wizard = controller(&gateway);

        wizard.submit_static_scan("profile").await.unwrap();
        let first = wizard.request_tactics().await.unwrap();
        let err = wizard.request_tactics().await.unwrap_err();

        assert!(matches!(err, WizardError::OutOfOrder { .. }));
        assert_eq!(wizard.snapshot(), first);
        assert_eq!(wizard.step(), WizardStep::Response);
        assert_eq!(wizard.history().len(), 2);
        assert_eq!(gateway.tactics_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_never_calls_service() {
        let gateway = Arc::new(MockGateway::new(scan_result(None)));
        let wizard = controller(&gateway);

        let err = wizard.submit_static_scan(" \n\t").await.unwrap_err();
        assert!(matches!(
            err,
            WizardError::Validation {
                field: Field::InputText
            }
        ));
        assert_eq!(gateway.calls(), 0);
        assert_eq!(wizard.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn test_empty_response_never_calls_service() {
        let mut scan = scan_result(None);
        scan.verification_tactics = tactics_result().verification_tactics;
        let gateway = Arc::new(MockGateway::new(scan));
        let wizard = controller(&gateway);
        wizard.submit_static_scan("profile").await.unwrap();
        wizard.request_tactics().await.unwrap();

        let err = wizard.submit_user_response("   ").await.unwrap_err();
        assert!(matches!(
            err,
            WizardError::Validation {
                field: Field::UserResponse
            }
        ));
        assert_eq!(gateway.full_calls.load(Ordering::SeqCst), 0);
        assert_eq!(wizard.step(), WizardStep::Response);
    }

    #[tokio::test]
    async fn test_out_of_order_is_rejected_without_call() {
        let gateway = Arc::new(MockGateway::new(scan_result(None)));
        let wizard = controller(&gateway);

        let err = wizard.submit_user_response("answer").await.unwrap_err();
        assert!(matches!(
            err,
            WizardError::OutOfOrder {
                action: WizardAction::SubmitUserResponse,
                step: WizardStep::Input
            }
        ));
        assert!(wizard.request_tactics().await.is_err());
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_leaves_state_unchanged() {
        let gateway = Arc::new(MockGateway::new(scan_result(Some(vec!["ask"]))));
        let wizard = controller(&gateway);
        wizard.set_input_text("draft").unwrap();

        gateway.fail_next(GatewayError::Timeout(Duration::from_secs(60)));
        let err = wizard.submit_static_scan("profile").await.unwrap_err();

        assert!(err.is_retryable());
        assert!(err.user_message().contains("too long"));
        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.step, WizardStep::Input);
        assert_eq!(snapshot.input_text, "draft");
        assert!(snapshot.result.is_none());
        assert!(!wizard.is_busy());

        // Manual retry succeeds
        let snapshot = wizard.submit_static_scan("profile").await.unwrap();
        assert_eq!(snapshot.step, WizardStep::Tactics);
    }

    #[tokio::test]
    async fn test_application_failure_keeps_previous_result() {
        let gateway = Arc::new(MockGateway::new(scan_result(Some(vec!["ask"]))));
        let wizard = controller(&gateway);
        wizard.submit_static_scan("profile").await.unwrap();
        let before = wizard.snapshot();

        gateway.fail_next(GatewayError::Application(riskflow_core::ApplicationError {
            message: "AI service unavailable".into(),
        }));
        let err = wizard.request_tactics().await.unwrap_err();

        assert!(err.user_message().contains("AI service unavailable"));
        assert_eq!(wizard.snapshot(), before);
    }

    #[tokio::test]
    async fn test_reset_from_result_and_midway() {
        let mut scan = scan_result(None);
        scan.verification_tactics = tactics_result().verification_tactics;
        let gateway = Arc::new(MockGateway::new(scan));
        let wizard = controller(&gateway);

        wizard.submit_static_scan("profile").await.unwrap();
        wizard.request_tactics().await.unwrap();
        wizard.submit_user_response("answer").await.unwrap();
        assert_eq!(wizard.reset(), SessionSnapshot::default());
        assert!(wizard.history().is_empty());

        wizard.submit_static_scan("second profile").await.unwrap();
        let snapshot = wizard.reset();
        assert_eq!(snapshot.step, WizardStep::Input);
        assert!(snapshot.result.is_none());
        assert!(snapshot.input_text.is_empty());
    }

    #[tokio::test]
    async fn test_second_call_while_in_flight_is_busy() {
        let gate = Arc::new(Notify::new());
        let gateway = Arc::new(MockGateway::gated(scan_result(None), gate.clone()));
        let wizard = Arc::new(controller(&gateway));

        let first = tokio::spawn({
            let wizard = wizard.clone();
            async move { wizard.submit_static_scan("profile").await }
        });
        while !wizard.is_busy() {
            tokio::task::yield_now().await;
        }

        let err = wizard.submit_static_scan("profile").await.unwrap_err();
        assert!(matches!(err, WizardError::Busy));
        assert_eq!(wizard.step(), WizardStep::Input);

        gate.notify_one();
        let snapshot = first.await.unwrap().unwrap();
        assert_eq!(snapshot.step, WizardStep::Tactics);
        assert_eq!(gateway.scan_calls.load(Ordering::SeqCst), 1);
        assert!(!wizard.is_busy());
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_result() {
        let gate = Arc::new(Notify::new());
        let gateway = Arc::new(MockGateway::gated(scan_result(None), gate.clone()));
        let wizard = Arc::new(controller(&gateway));

        let pending = tokio::spawn({
            let wizard = wizard.clone();
            async move { wizard.submit_static_scan("profile").await }
        });
        while !wizard.is_busy() {
            tokio::task::yield_now().await;
        }

        wizard.reset();
        gate.notify_one();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, WizardError::Superseded));
        assert_eq!(wizard.snapshot(), SessionSnapshot::default());
        assert!(!wizard.is_busy());
    }

    #[tokio::test]
    async fn test_subscribers_see_committed_steps() {
        let gateway = Arc::new(MockGateway::new(scan_result(Some(vec!["ask"]))));
        let wizard = controller(&gateway);
        let mut updates = wizard.subscribe();

        wizard.submit_static_scan("profile").await.unwrap();
        assert!(updates.has_changed().unwrap());
        let seen = updates.borrow_and_update().clone();
        assert_eq!(seen.step, WizardStep::Tactics);
        assert!(seen.result.is_some());
    }

    #[test]
    fn test_builder_requires_gateway() {
        assert!(WizardControllerBuilder::new().build().is_err());

        let gateway: Arc<dyn AnalysisGateway> = Arc::new(MockGateway::new(scan_result(None)));
        let wizard = WizardControllerBuilder::new()
            .gateway(gateway)
            .input_text("staged")
            .build()
            .unwrap();
        assert_eq!(wizard.snapshot().input_text, "staged");
        assert_eq!(wizard.step(), WizardStep::Input);
    }

    #[test]
    fn test_builder_without_input_starts_empty() {
        let gateway: Arc<dyn AnalysisGateway> = Arc::new(MockGateway::new(scan_result(None)));
        let wizard = WizardControllerBuilder::new().gateway(gateway).build().unwrap();

        assert!(wizard.snapshot().input_text.is_empty());
        assert!(wizard.history().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Scan(bool),
        Tactics,
        Respond(bool),
        Reset,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<bool>().prop_map(Op::Scan),
            Just(Op::Tactics),
            any::<bool>().prop_map(Op::Respond),
            Just(Op::Reset),
        ]
    }

    proptest! {
        #[test]
        fn prop_rejected_ops_make_no_calls(ops in proptest::collection::vec(op(), 1..24)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let gateway = Arc::new(MockGateway::new(scan_result(Some(vec!["ask"]))));
                let wizard = controller(&gateway);

                for op in ops {
                    let before = wizard.snapshot();
                    let calls = gateway.calls();

                    let outcome = match op {
                        Op::Scan(filled) => wizard
                            .submit_static_scan(if filled { "profile" } else { "  " })
                            .await
                            .map(|_| ()),
                        Op::Tactics => wizard.request_tactics().await.map(|_| ()),
                        Op::Respond(filled) => wizard
                            .submit_user_response(if filled { "answer" } else { "" })
                            .await
                            .map(|_| ()),
                        Op::Reset => {
                            wizard.reset();
                            Ok(())
                        }
                    };

                    let after = wizard.snapshot();
                    if let Err(err) = outcome {
                        let rejected = matches!(
                            err,
                            WizardError::Validation { .. } | WizardError::OutOfOrder { .. }
                        );
                        prop_assert!(rejected, "unexpected error: {}", err);
                        prop_assert_eq!(gateway.calls(), calls);
                        prop_assert_eq!(&after, &before);
                    }
                    prop_assert!(after.step == WizardStep::Input || after.result.is_some());
                    prop_assert!(!wizard.is_busy());
                }
                Ok(())
            })?;
        }
    }
}
