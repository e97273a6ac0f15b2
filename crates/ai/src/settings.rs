use std::fmt;

use dbchat_core::errors::LlmError;

use crate::env::{AiEnvironment, ProcessEnvironment};
use crate::providers::ProviderKind;

/// Base URL override, mostly for Ollama running on another host.
pub const BASE_URL_ENV: &str = "DBCHAT_LLM_BASE_URL";

/// Low temperature keeps generated SQL focused.
pub const DEFAULT_TEMPERATURE: f64 = 0.0;

/// Upper bound on generated tokens per call.
pub const DEFAULT_MAX_TOKENS: u64 = 1024;

/// Everything needed to build a provider client.
#[derive(Clone)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl LlmSettings {
    /// Resolve settings from the process environment.
    ///
    /// `model` falls back to the provider's default when `None` or blank.
    pub fn from_env(provider_id: &str, model: Option<&str>) -> Result<Self, LlmError> {
        Self::from_environment(&ProcessEnvironment, provider_id, model)
    }

    pub fn from_environment(
        env: &dyn AiEnvironment,
        provider_id: &str,
        model: Option<&str>,
    ) -> Result<Self, LlmError> {
        let provider: ProviderKind = provider_id.parse()?;

        let api_key = match provider.api_key_env() {
            Some(key_env) => {
                let key = non_blank(env.var(key_env))
                    .ok_or_else(|| LlmError::MissingApiKey(format!("{} ({})", provider, key_env)))?;
                Some(key)
            }
            None => None,
        };

        let model = non_blank(model.map(str::to_string))
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(Self {
            provider,
            model,
            api_key,
            base_url: non_blank(env.var(BASE_URL_ENV)),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// `provider/model` label for logs and health output.
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
