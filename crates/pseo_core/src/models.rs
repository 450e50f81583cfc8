use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::Result;

/// A single request to the text model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ContentModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Returns the raw response text. Callers must treat it as untrusted.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// What an image source hands back for a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutput {
    /// An absolute URL hosted by the source.
    Url(String),
    /// Base64 payload, either bare or as a `data:` URI.
    Inline(String),
}

#[async_trait]
pub trait ImageSource: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<ImageOutput>;
}
