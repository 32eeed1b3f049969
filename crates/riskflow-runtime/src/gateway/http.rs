//! HTTP implementation of the gateways over reqwest.

use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use riskflow_core::config::{validate_knowledge_filename, validate_weight_schema, ConfigError};
use riskflow_core::{
    AiAnalysis, AnalysisResult, ApplicationError, DynamicSession, Envelope, HealthStatus,
    KnowledgeBase, KnowledgeFile, RiskRuleSet, TriggeredRule, WeightConfig,
};

use super::{
    AnalysisGateway, ConfigGateway, DynamicAnalysisRequest, FullAnalysisRequest,
    GatewayError, GenerateTacticsRequest, RulesData, StaticScanRequest, WeightData,
};
use crate::config::GatewayConfig;

/// Longest error body echoed back in [`GatewayError::Http`].
const MAX_ERROR_BODY: usize = 200;

/// Client for the analysis service's `/api/v1` endpoints.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway with its own connection pool.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::NotConfigured(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a gateway from `RISKFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(GatewayConfig::from_env()?)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn get<T>(&self, path: &'static str) -> Result<T, GatewayError>
    where
        T: DeserializeOwned + Default,
    {
        let request = self.client.get(self.config.endpoint(path));
        let body = self.send(path, request).await?;
        decode_envelope(path, &body)
    }

    async fn post<B, T>(&self, path: &'static str, payload: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let request = self.client.post(self.config.endpoint(path)).json(payload);
        let body = self.send(path, request).await?;
        decode_envelope(path, &body)
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(
        &self,
        path: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<u8>, GatewayError> {
        let started = Instant::now();
        tracing::debug!(endpoint = path, "Sending request");

        let response = request.send().await.map_err(|e| self.transport_error(path, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(path, e))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            });
            tracing::warn!(endpoint = path, status = status.as_u16(), elapsed_ms, %message, "Request failed");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(endpoint = path, status = status.as_u16(), elapsed_ms, "Request completed");
        Ok(body.to_vec())
    }

    fn transport_error(&self, path: &'static str, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            tracing::warn!(endpoint = path, timeout = ?self.config.timeout, "Request timed out");
            GatewayError::Timeout(self.config.timeout)
        } else {
            tracing::warn!(endpoint = path, error = %error, "Request could not be completed");
            GatewayError::Transport(error.to_string())
        }
    }
}

/// Decode a `{success, data, message?}` envelope and unwrap it.
fn decode_envelope<T>(path: &'static str, body: &[u8]) -> Result<T, GatewayError>
where
    T: DeserializeOwned + Default,
{
    let envelope: Envelope<T> =
        serde_json::from_slice(body).map_err(|e| GatewayError::Decode(e.to_string()))?;

    envelope.into_result().map_err(|e| {
        tracing::warn!(endpoint = path, message = %e.message, "Service reported failure");
        GatewayError::Application(e)
    })
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI reports errors as `{"detail": ...}`; envelopes use `message`.
fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<JsonValue>(body) {
        for key in ["detail", "message"] {
            match value.get(key) {
                Some(JsonValue::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(JsonValue::Null) | None => {}
                Some(other) => return Some(other.to_string()),
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(MAX_ERROR_BODY).collect())
    }
}

#[async_trait]
impl AnalysisGateway for HttpGateway {
    async fn static_scan(&self, text: &str) -> Result<AnalysisResult, GatewayError> {
        self.post("/static-scan", &StaticScanRequest { text }).await
    }

    async fn generate_tactics(
        &self,
        text: &str,
        rules: &[TriggeredRule],
        ai_analysis: &AiAnalysis,
    ) -> Result<AnalysisResult, GatewayError> {
        let request = GenerateTacticsRequest {
            input_text: text,
            rules,
            ai_analysis,
        };
        self.post("/generate-tactics", &request).await
    }

    async fn dynamic_analysis(
        &self,
        response_text: &str,
    ) -> Result<DynamicSession, GatewayError> {
        self.post("/dynamic-analysis", &DynamicAnalysisRequest { response_text })
            .await
    }

    async fn full_analysis(
        &self,
        input_text: &str,
        user_response: &str,
    ) -> Result<AnalysisResult, GatewayError> {
        let request = FullAnalysisRequest {
            input_text,
            user_response,
        };
        self.post("/full-analysis", &request).await
    }

    async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        let path = "/health";
        let body = self.send(path, self.client.get(self.config.endpoint(path))).await?;

        // The health route answers with a bare status object, not an envelope.
        let value: JsonValue =
            serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let status: HealthStatus = if value.get("success").is_some() {
            decode_envelope(path, &body)?
        } else {
            serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))?
        };

        if status.is_healthy() {
            Ok(status)
        } else {
            Err(GatewayError::Application(ApplicationError {
                message: format!("service status is '{}'", status.status),
            }))
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[async_trait]
impl ConfigGateway for HttpGateway {
    async fn get_risk_rules(&self) -> Result<RiskRuleSet, GatewayError> {
        let data: RulesData = self.get("/risk-rules").await?;
        Ok(data.rules)
    }

    async fn update_risk_rules(&self, rules: &RiskRuleSet) -> Result<RiskRuleSet, GatewayError> {
        rules.validate()?;
        let data: RulesData = self.post("/risk-rules", rules).await?;
        Ok(data.rules)
    }

    async fn get_weight_config(&self) -> Result<WeightConfig, GatewayError> {
        let data: WeightData = self.get("/weight-config").await?;
        Ok(data.config)
    }

    async fn update_weight_config(
        &self,
        config: &WeightConfig,
    ) -> Result<WeightConfig, GatewayError> {
        let value =
            serde_json::to_value(config).map_err(|e| GatewayError::Decode(e.to_string()))?;
        validate_weight_schema(&value).map_err(ConfigError::Schema)?;
        config.validate()?;

        let data: WeightData = self.post("/weight-config", &value).await?;
        Ok(data.config)
    }

    async fn get_knowledge_base(&self) -> Result<KnowledgeBase, GatewayError> {
        self.get("/knowledge-base").await
    }

    async fn upload_knowledge(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<KnowledgeFile, GatewayError> {
        validate_knowledge_filename(filename)?;

        let part = reqwest::multipart::Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str("text/csv")
            .map_err(|e| GatewayError::NotConfigured(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let path = "/upload-knowledge";
        let request = self.client.post(self.config.endpoint(path)).multipart(form);
        let body = self.send(path, request).await?;
        decode_envelope(path, &body)
    }
}
