//! dbchat AI - LLM completion clients using rig-core.
//!
//! # Architecture
//!
//! - `providers`: Provider catalog (ids, default models, key variables)
//! - `settings`: Resolution of provider, model and API key from the environment
//! - `env`: Environment abstraction used by settings resolution
//! - `client`: `RigLlmClient`, the production `LlmClient`
//! - `fake`: `FakeLlmClient`, a scripted client for tests
//!
//! # Example
//!
//! ```ignore
//! use dbchat_ai::{LlmSettings, RigLlmClient};
//!
//! let settings = LlmSettings::from_env("groq", None)?;
//! let llm = RigLlmClient::new(settings)?;
//! let sql = llm.complete(&prompt).await?;
//! ```

pub mod client;
pub mod env;
pub mod fake;
pub mod providers;
pub mod settings;

pub use client::RigLlmClient;
pub use env::{AiEnvironment, ProcessEnvironment};
pub use fake::FakeLlmClient;
pub use providers::{ProviderKind, DEFAULT_PROVIDER};
pub use settings::LlmSettings;
