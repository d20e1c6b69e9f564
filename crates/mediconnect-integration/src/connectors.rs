//! 诊断模型连接器
//!
//! 通过HTTP调用外部生成式模型：
//! - 请求体 `{prompt, max_gen_len, temperature, top_p}`
//! - 响应体中的 `generation` 字段即模型输出文本
//! - 支持API Key、Bearer Token和Basic认证

use async_trait::async_trait;
use mediconnect_core::{DiagnosisModel, Result, TriageError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// 模型ID请求头
pub const MODEL_ID_HEADER: &str = "X-Model-Id";

/// 认证配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthenticationConfig {
    #[default]
    None,
    BasicAuth { username: String, password: String },
    ApiKey { key: String, header: Option<String> },
    BearerToken { token: String },
}

/// HTTP模型连接器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpModelConfig {
    pub endpoint: String,
    pub model_id: String,
    pub max_gen_len: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub timeout_secs: u64,
    pub authentication: AuthenticationConfig,
}

impl Default for HttpModelConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model_id: "meta.llama3-70b-instruct-v1:0".to_string(),
            max_gen_len: 800,
            temperature: 0.0,
            top_p: 0.9,
            timeout_secs: 60,
            authentication: AuthenticationConfig::None,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    max_gen_len: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    generation: String,
}

/// 基于HTTP的诊断模型连接器
pub struct HttpModelConnector {
    name: String,
    config: HttpModelConfig,
    client: reqwest::Client,
}

impl HttpModelConnector {
    /// 创建连接器
    pub fn new(config: HttpModelConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(TriageError::Config("Model endpoint is not configured".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TriageError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!("Initializing HTTP model connector for {} at {}", config.model_id, config.endpoint);

        Ok(Self {
            name: format!("http:{}", config.model_id),
            config,
            client,
        })
    }

    pub fn config(&self) -> &HttpModelConfig {
        &self.config
    }

    /// 添加认证头
    fn add_auth_headers(
        request: reqwest::RequestBuilder,
        auth: &AuthenticationConfig,
    ) -> reqwest::RequestBuilder {
        match auth {
            AuthenticationConfig::None => request,
            AuthenticationConfig::BasicAuth { username, password } => {
                request.basic_auth(username, Some(password))
            }
            AuthenticationConfig::ApiKey { key, header } => {
                let header_name = header.as_deref().unwrap_or("X-API-Key");
                request.header(header_name, key)
            }
            AuthenticationConfig::BearerToken { token } => request.bearer_auth(token),
        }
    }
}

#[async_trait]
impl DiagnosisModel for HttpModelConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        let body = GenerationRequest {
            prompt,
            max_gen_len: self.config.max_gen_len,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        };

        let request = self
            .client
            .post(&self.config.endpoint)
            .header(MODEL_ID_HEADER, &self.config.model_id)
            .json(&body);
        let request = Self::add_auth_headers(request, &self.config.authentication);

        debug!("Invoking model {} ({} prompt bytes)", self.config.model_id, prompt.len());

        let response = request.send().await.map_err(|e| {
            error!("Model request to {} failed: {}", self.config.endpoint, e);
            TriageError::UpstreamCallFailed(format!("Model request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Model {} returned {}: {}", self.config.model_id, status, detail);
            return Err(TriageError::UpstreamCallFailed(format!(
                "Model returned {}: {}",
                status, detail
            )));
        }

        let parsed: GenerationResponse = response.json().await.map_err(|e| {
            TriageError::UpstreamCallFailed(format!("Invalid model response body: {}", e))
        })?;

        if parsed.generation.trim().is_empty() {
            return Err(TriageError::UpstreamCallFailed(
                "Empty response from model".to_string(),
            ));
        }

        Ok(parsed.generation)
    }
}
