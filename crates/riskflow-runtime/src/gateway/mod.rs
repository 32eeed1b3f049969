//! Gateway abstractions for the external analysis service.
//!
//! This module defines the traits the wizard controller and the CLI talk to,
//! and the HTTP implementation used in production.
//!
//! ## Error model
//!
//! Every response is a `{success, data, message?}` envelope. A
//! `success: false` envelope is an application-level failure
//! ([`GatewayError::Application`]); HTTP errors, unreachable hosts and
//! timeouts are transport-level failures. A timeout is its own variant so
//! callers can word it differently.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use riskflow_core::config::ConfigError;
use riskflow_core::{
    AiAnalysis, AnalysisResult, ApplicationError, DynamicSession, HealthStatus, KnowledgeBase,
    KnowledgeFile, RiskRuleSet, TriggeredRule, WeightConfig,
};

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpGateway;

/// Errors from the analysis service gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("API error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Analysis service rejected the request: {0}")]
    Application(#[from] ApplicationError),

    #[error("JSON parse error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ConfigError),

    #[error("Gateway not configured: {0}")]
    NotConfigured(String),
}

/// Coarse classification of a [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network unreachable, non-2xx, undecodable body
    Transport,
    /// The fixed request timeout elapsed
    Timeout,
    /// `success: false` envelope
    Application,
    /// Refused locally before sending
    Local,
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) | Self::Http { .. } | Self::Decode(_) => FailureKind::Transport,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Application(_) => FailureKind::Application,
            Self::InvalidRequest(_) | Self::NotConfigured(_) => FailureKind::Local,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == FailureKind::Timeout
    }

    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), FailureKind::Local)
    }
}

/// Body of `POST /static-scan`.
#[derive(Debug, Serialize)]
pub(crate) struct StaticScanRequest<'a> {
    pub text: &'a str,
}

/// Body of `POST /generate-tactics`.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateTacticsRequest<'a> {
    pub input_text: &'a str,
    pub rules: &'a [TriggeredRule],
    pub ai_analysis: &'a AiAnalysis,
}

/// Body of `POST /dynamic-analysis`.
#[derive(Debug, Serialize)]
pub(crate) struct DynamicAnalysisRequest<'a> {
    pub response_text: &'a str,
}

/// Body of `POST /full-analysis`.
#[derive(Debug, Serialize)]
pub(crate) struct FullAnalysisRequest<'a> {
    pub input_text: &'a str,
    pub user_response: &'a str,
}

/// `data` of the risk rules endpoints.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RulesData {
    #[serde(default)]
    pub rules: RiskRuleSet,
}

/// `data` of the weight config endpoints.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct WeightData {
    #[serde(default)]
    pub config: WeightConfig,
}

/// The analysis operations behind each wizard step.
///
/// # Contract
/// Implementations make exactly one request per call and never retry.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Rule-based scan of the free-text profile.
    async fn static_scan(&self, text: &str) -> Result<AnalysisResult, GatewayError>;

    /// Expand AI suggestions into verification tactics.
    async fn generate_tactics(
        &self,
        text: &str,
        rules: &[TriggeredRule],
        ai_analysis: &AiAnalysis,
    ) -> Result<AnalysisResult, GatewayError>;

    /// Score a counterpart response on its own.
    async fn dynamic_analysis(&self, response_text: &str)
        -> Result<DynamicSession, GatewayError>;

    /// Static scan, tactics, response analysis and decision in one call.
    async fn full_analysis(
        &self,
        input_text: &str,
        user_response: &str,
    ) -> Result<AnalysisResult, GatewayError>;

    /// Check the service is up.
    async fn health_check(&self) -> Result<HealthStatus, GatewayError>;

    /// Gateway name for logs.
    fn name(&self) -> &str;
}

/// Remote editing of the service's rules, weights and knowledge base.
#[async_trait]
pub trait ConfigGateway: Send + Sync {
    async fn get_risk_rules(&self) -> Result<RiskRuleSet, GatewayError>;

    /// Replace the rule set. Rules are validated locally first.
    async fn update_risk_rules(&self, rules: &RiskRuleSet) -> Result<RiskRuleSet, GatewayError>;

    async fn get_weight_config(&self) -> Result<WeightConfig, GatewayError>;

    /// Replace the weight config. The config is validated locally first.
    async fn update_weight_config(
        &self,
        config: &WeightConfig,
    ) -> Result<WeightConfig, GatewayError>;

    async fn get_knowledge_base(&self) -> Result<KnowledgeBase, GatewayError>;

    /// Upload a CSV file into the knowledge base.
    async fn upload_knowledge(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<KnowledgeFile, GatewayError>;
}
