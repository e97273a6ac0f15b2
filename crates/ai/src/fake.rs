//! Deterministic `LlmClient` for tests and local demos.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use dbchat_core::errors::LlmError;
use dbchat_core::llm::LlmClient;

/// Replays scripted replies in order and records every prompt it receives.
///
/// When built with a gate, each call waits for one permit released through
/// `FakeLlmClient::release`, which lets a test hold a turn open.
#[derive(Default)]
pub struct FakeLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client answering with `replies`, one per call.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    /// Make every call block until `release` is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_replies().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: LlmError) {
        self.lock_replies().push_back(Err(error));
    }

    /// Let `n` gated calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| LlmError::Provider(e.to_string()))?;
            permit.forget();
        }

        self.lock_replies()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Provider("no scripted reply left".to_string())))
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}
