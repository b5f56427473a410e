//! Completion abstraction and the OpenAI-compatible completions client.
//!
//! The resolver only needs "prompt in, text out"; `CompletionBackend` is that seam.

mod openai;

use async_trait::async_trait;

pub use openai::{CompletionClient, CompletionRequest, CompletionResponse, ProviderError};

/// Something that turns a prompt into generated text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate a continuation for `prompt`. Returned text is untrimmed.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}
