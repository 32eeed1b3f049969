//! # riskflow-core
//!
//! Deterministic core of the riskflow analysis client.
//!
//! This crate models the four-step risk questionnaire:
//! - What the analysis service returns ([`AnalysisResult`] and friends)
//! - Which step comes next, and when an action is refused ([`wizard`])
//! - What each step renders ([`report`])
//! - Backend configuration payloads, validated locally ([`config`])
//!
//! ## Key Guarantees
//!
//! 1. **No network I/O**: service calls live in `riskflow-runtime`
//! 2. **Total views**: every step view is built from an explicit presence
//!    check, and steps after `Input` cannot be built without a result
//! 3. **Atomic steps**: a [`Session`] changes step and result together
//!
//! ## Example
//!
//! ```rust
//! use riskflow_core::{AnalysisResult, Session, WizardAction, WizardStep};
//!
//! let mut session = Session::new();
//! session.set_input_text("男，1988，某私募MD").unwrap();
//!
//! let scanned = AnalysisResult { score: Some(62.0), ..Default::default() };
//! session.advance(WizardAction::SubmitStaticScan, Some(scanned)).unwrap();
//! assert_eq!(session.step(), WizardStep::Tactics);
//! ```

pub mod config;
pub mod report;
pub mod types;
pub mod wizard;

// Re-export main types at crate root
pub use config::{ConfigError, KnowledgeBase, KnowledgeFile, RiskRuleSet, WeightConfig};
pub use report::{DecisionView, RiskBand, ScanView, StepView};
pub use types::{
    AiAnalysis, AnalysisResult, ApplicationError, Decision, DetectionMethod, DynamicSession,
    Envelope, HealthStatus, StaticScanSummary, TacticPriority, TriggeredRule, Verdict,
    VerificationTactic, WizardStep,
};
pub use wizard::{
    plan_tactics, validate_required, Field, Session, SessionSnapshot, StepError, TacticsPlan,
    Transition, WizardAction,
};
