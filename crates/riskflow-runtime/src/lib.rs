//! # riskflow-runtime
//!
//! Service access for riskflow.
//!
//! This crate connects the deterministic wizard in `riskflow-core` to the
//! external analysis service:
//! - [`AnalysisGateway`] and [`ConfigGateway`] describe the service's
//!   operations; [`HttpGateway`] implements both over HTTP
//! - [`WizardController`] runs the four-step questionnaire, one request at a
//!   time, committing each step only when its request succeeds
//!
//! All scoring, rule matching and AI reasoning happen in the service. Nothing
//! here retries: failures come back as [`WizardError`] for the user to retry.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use riskflow_runtime::{GatewayConfig, HttpGateway, WizardController};
//!
//! let gateway = HttpGateway::new(GatewayConfig::from_env()?)?;
//! let wizard = WizardController::new(Arc::new(gateway));
//!
//! wizard.submit_static_scan("男，1988，某私募MD").await?;
//! wizard.request_tactics().await?;
//! let snapshot = wizard.submit_user_response("我管的是量化基金").await?;
//! println!("{:?}", snapshot.result);
//! ```

pub mod config;
pub mod controller;
pub mod gateway;

pub use config::GatewayConfig;
pub use controller::{WizardController, WizardControllerBuilder, WizardError};
pub use gateway::{AnalysisGateway, ConfigGateway, FailureKind, GatewayError};

#[cfg(feature = "http")]
pub use gateway::HttpGateway;
