//! LLM client boundary.
//!
//! The session controller only needs "text in, text out". The `ai` crate
//! implements this over rig-core providers; tests use scripted fakes.

use async_trait::async_trait;

use crate::errors::LlmError;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Short label for logs, e.g. `groq/llama-3.3-70b-versatile`.
    fn describe(&self) -> String {
        "llm".to_string()
    }
}
