//! Client for an OpenAI-compatible completion server (vLLM, TGI, hosted APIs).

use async_trait::async_trait;
use reqwest::{header, Client};
use rtl_bench_core::{CoreError, GenerationRequest, ModelBackend, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use validator::Validate;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(default)]
pub struct InferenceConfig {
    /// API root including the version segment, e.g. `http://localhost:8000/v1`.
    #[validate(length(min = 1))]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    pub api_key: Option<String>,
    /// Wrap prompts in a system/user chat exchange instead of raw completion.
    pub use_chat_template: bool,
    pub system_prompt: String,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    #[validate(range(max = 10))]
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            model: "default".to_string(),
            api_key: None,
            use_chat_template: true,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout_secs: 600,
            max_retries: 3,
            retry_backoff_ms: 1000,
        }
    }
}

/// Exponential backoff before retry `attempt + 1`, saturating on overflow.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: Client,
    config: InferenceConfig,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = &config.api_key {
            let value = header::HeaderValue::try_from(format!("Bearer {}", key))
                .map_err(|e| CoreError::Configuration(format!("invalid API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| CoreError::Inference(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn request_body(&self, request: &GenerationRequest) -> (String, Value) {
        let mut body = if self.config.use_chat_template {
            json!({
                "model": self.config.model,
                "messages": [
                    {"role": "system", "content": self.config.system_prompt},
                    {"role": "user", "content": request.prompt},
                ],
            })
        } else {
            json!({
                "model": self.config.model,
                "prompt": request.prompt,
            })
        };

        body["n"] = json!(request.samples);
        body["temperature"] = json!(request.temperature);
        body["max_tokens"] = json!(request.max_tokens);
        if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }

        let path = if self.config.use_chat_template {
            "chat/completions"
        } else {
            "completions"
        };
        (self.url(path), body)
    }

    async fn call(&self, url: &str, body: &Value) -> Result<Vec<String>> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| CoreError::Inference(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Inference(format!(
                "server returned {}: {}",
                status, text
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Inference(format!("malformed completion response: {}", e)))?;

        let mut choices = parsed.choices;
        choices.sort_by_key(|c| c.index);
        let texts: Vec<String> = choices
            .into_iter()
            .filter_map(|c| c.message.map(|m| m.content).or(c.text))
            .collect();

        if texts.is_empty() {
            return Err(CoreError::Inference("response contained no choices".to_string()));
        }
        Ok(texts)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    index: usize,
    text: Option<String>,
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        let (url, body) = self.request_body(request);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.call(&url, &body).await {
                Ok(texts) => {
                    if texts.len() < request.samples {
                        tracing::warn!(
                            requested = request.samples,
                            received = texts.len(),
                            "server returned fewer samples than requested"
                        );
                    }
                    return Ok(texts);
                }
                Err(e) => {
                    if attempt < self.config.max_retries {
                        tracing::warn!("Inference attempt {} failed: {}, retrying...", attempt + 1, e);
                        sleep(backoff_delay(self.config.retry_backoff_ms, attempt)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::Inference("no attempts made".to_string())))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
