use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::SamplingConfig;
use crate::error::Result;

/// A single prompt fanned out into `samples` completions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub samples: usize,
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, sampling: &SamplingConfig) -> Self {
        Self {
            prompt: prompt.into(),
            samples: sampling.effective_batch_size(),
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_tokens,
        }
    }
}

/// Language-model inference engine: prompt in, free-text completions out.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>>;
    fn model_name(&self) -> &str;
}
