use std::sync::Arc;

use crate::{
    config::Config,
    sessions::{SessionLimits, SessionRegistry},
};
use dbchat_ai::{LlmSettings, RigLlmClient};
use dbchat_core::gateway::DatabaseGateway;
use dbchat_core::llm::LlmClient;
use dbchat_core::session::SessionOptions;
use dbchat_storage_sql::{GatewayOptions, SqlGateway};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub sessions: SessionRegistry,
}

pub fn init_tracing() {
    let log_format = std::env::var("DBCHAT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Production state: rig-core client for the configured provider and the
/// sqlx gateway. Fails when the provider's API key is missing.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let settings = LlmSettings::from_env(config.llm_provider.id(), config.llm_model.as_deref())?;
    tracing::info!("Using LLM {}", settings.label());
    let llm: Arc<dyn LlmClient> = Arc::new(RigLlmClient::new(settings)?);

    let gateway: Arc<dyn DatabaseGateway> = Arc::new(SqlGateway::new(GatewayOptions {
        max_result_rows: config.max_result_rows,
        sample_rows: config.sample_rows,
        ..Default::default()
    }));

    Ok(build_state_with(config, llm, gateway))
}

/// State over caller-supplied collaborators (tests, alternative backends).
pub fn build_state_with(
    config: &Config,
    llm: Arc<dyn LlmClient>,
    gateway: Arc<dyn DatabaseGateway>,
) -> Arc<AppState> {
    let options = SessionOptions {
        cache_schema: config.schema_cache,
    };
    tracing::info!(
        "SQL policy: {}, schema cache: {}",
        config.sql_policy.build().name(),
        options.cache_schema
    );
    let limits = SessionLimits {
        idle_ttl: config.session_idle_ttl,
        max_sessions: config.max_sessions,
    };
    let sessions = SessionRegistry::new(gateway, llm, config.sql_policy.build(), options, limits);
    Arc::new(AppState { sessions })
}
