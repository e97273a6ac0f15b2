//! `LlmClient` implementation over rig-core providers.
//!
//! Each completion is a single agent prompt without tools or history; the
//! conversation is already rendered into the prompt text.

use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use rig::{
    client::{CompletionClient, Nothing},
    completion::Prompt,
    providers::{anthropic, gemini, groq, ollama, openai},
};

use dbchat_core::errors::LlmError;
use dbchat_core::llm::LlmClient;

use crate::providers::ProviderKind;
use crate::settings::LlmSettings;

/// Completion client for the provider named in `LlmSettings`.
pub struct RigLlmClient {
    settings: LlmSettings,
}

impl RigLlmClient {
    /// Fails when a hosted provider has no API key.
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        if settings.provider.requires_api_key() && settings.api_key.is_none() {
            return Err(LlmError::MissingApiKey(settings.provider.to_string()));
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.settings
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingApiKey(self.settings.provider.to_string()))
    }
}

macro_rules! prompt_agent {
    ($client:expr, $settings:expr, $prompt:expr) => {{
        $client
            .agent(&$settings.model)
            .temperature($settings.temperature)
            .max_tokens($settings.max_tokens)
            .build()
            .prompt($prompt)
            .await
            .map_err(|e| LlmError::Provider(e.to_string()))?
    }};
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let settings = &self.settings;
        debug!(
            "Prompting {} ({} chars)",
            settings.label(),
            prompt.len()
        );

        let response: String = match settings.provider {
            ProviderKind::Groq => {
                let client: groq::Client<HttpClient> =
                    groq::Client::new(self.api_key()?).map_err(provider_error)?;
                prompt_agent!(client, settings, prompt)
            }
            ProviderKind::Anthropic => {
                let client: anthropic::Client<HttpClient> =
                    anthropic::Client::new(self.api_key()?).map_err(provider_error)?;
                prompt_agent!(client, settings, prompt)
            }
            ProviderKind::Gemini => {
                let client: gemini::Client<HttpClient> =
                    gemini::Client::new(self.api_key()?).map_err(provider_error)?;
                prompt_agent!(client, settings, prompt)
            }
            ProviderKind::OpenAi => {
                // Completions API rather than the Responses API.
                let client: openai::CompletionsClient<HttpClient> =
                    openai::CompletionsClient::builder()
                        .api_key(self.api_key()?)
                        .build()
                        .map_err(provider_error)?;
                prompt_agent!(client, settings, prompt)
            }
            ProviderKind::Ollama => {
                let mut builder = ollama::Client::<HttpClient>::builder().api_key(Nothing);
                if let Some(url) = &settings.base_url {
                    builder = builder.base_url(url);
                }
                let client = builder.build().map_err(provider_error)?;
                prompt_agent!(client, settings, prompt)
            }
        };

        let text = response.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    fn describe(&self) -> String {
        self.settings.label()
    }
}

fn provider_error(err: impl std::fmt::Display) -> LlmError {
    LlmError::Provider(err.to_string())
}
