use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: Some(1024),
        }
    }
}

/// Everything the model sees for one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    pub system_prompt: String,
    /// Rendered step context: history window, memory, perception and task.
    pub context: String,
    /// Base64 PNG of the current page, when the perception carries one.
    pub screenshot: Option<String>,
    pub options: ModelOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageModelUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageModelResponse {
    pub text: String,
    pub usage: LanguageModelUsage,
}

impl LanguageModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: LanguageModelUsage::default(),
        }
    }
}

/// Chat-completion backend. Any error returned here is treated as an
/// unreachable external service and aborts the run.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<LanguageModelResponse>;
}
