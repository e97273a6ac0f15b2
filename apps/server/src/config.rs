use std::{net::SocketAddr, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use dbchat_ai::{ProviderKind, DEFAULT_PROVIDER};
use dbchat_core::constants::{DEFAULT_MAX_RESULT_ROWS, DEFAULT_SAMPLE_ROWS};
use dbchat_core::sql_policy::SqlPolicyKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name}='{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub static_dir: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub llm_provider: ProviderKind,
    /// Provider default when `None`.
    pub llm_model: Option<String>,
    pub schema_cache: bool,
    pub sql_policy: SqlPolicyKind,
    pub max_result_rows: usize,
    pub sample_rows: usize,
    /// Sessions untouched for this long are dropped with their connection.
    pub session_idle_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub max_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            static_dir: "static".to_string(),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(120_000),
            llm_provider: DEFAULT_PROVIDER,
            llm_model: None,
            schema_cache: false,
            sql_policy: SqlPolicyKind::default(),
            max_result_rows: DEFAULT_MAX_RESULT_ROWS,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            session_idle_ttl: Duration::from_secs(30 * 60),
            session_sweep_interval: Duration::from_secs(60),
            max_sessions: 1000,
        }
    }
}

impl Config {
    /// Load `.env`, then read every `DBCHAT_*` variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let listen_addr = parse_or("DBCHAT_LISTEN_ADDR", var("DBCHAT_LISTEN_ADDR"), defaults.listen_addr)?;
        let static_dir = var("DBCHAT_STATIC_DIR").unwrap_or(defaults.static_dir);

        let cors_allow = match var("DBCHAT_CORS_ALLOW_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => defaults.cors_allow,
        };

        let timeout_ms: u64 = parse_or(
            "DBCHAT_REQUEST_TIMEOUT_MS",
            var("DBCHAT_REQUEST_TIMEOUT_MS"),
            defaults.request_timeout.as_millis() as u64,
        )?;

        let llm_provider = match var("DBCHAT_LLM_PROVIDER") {
            Some(raw) => raw.parse::<ProviderKind>().map_err(|e| ConfigError::Invalid {
                name: "DBCHAT_LLM_PROVIDER",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.llm_provider,
        };

        let schema_cache = match var("DBCHAT_SCHEMA_CACHE") {
            Some(raw) => parse_bool("DBCHAT_SCHEMA_CACHE", &raw)?,
            None => defaults.schema_cache,
        };

        let sql_policy = parse_or("DBCHAT_SQL_POLICY", var("DBCHAT_SQL_POLICY"), defaults.sql_policy)?;
        let max_result_rows = parse_or(
            "DBCHAT_MAX_RESULT_ROWS",
            var("DBCHAT_MAX_RESULT_ROWS"),
            defaults.max_result_rows,
        )?;
        let sample_rows = parse_or("DBCHAT_SAMPLE_ROWS", var("DBCHAT_SAMPLE_ROWS"), defaults.sample_rows)?;

        let idle_ttl_secs: u64 = parse_or(
            "DBCHAT_SESSION_IDLE_TTL_SECS",
            var("DBCHAT_SESSION_IDLE_TTL_SECS"),
            defaults.session_idle_ttl.as_secs(),
        )?;
        let sweep_secs: u64 = parse_or(
            "DBCHAT_SESSION_SWEEP_SECS",
            var("DBCHAT_SESSION_SWEEP_SECS"),
            defaults.session_sweep_interval.as_secs(),
        )?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "DBCHAT_SESSION_SWEEP_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let max_sessions = parse_or("DBCHAT_MAX_SESSIONS", var("DBCHAT_MAX_SESSIONS"), defaults.max_sessions)?;

        Ok(Self {
            listen_addr,
            static_dir,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            llm_provider,
            llm_model: var("DBCHAT_LLM_MODEL"),
            schema_cache,
            sql_policy,
            max_result_rows,
            sample_rows,
            session_idle_ttl: Duration::from_secs(idle_ttl_secs),
            session_sweep_interval: Duration::from_secs(sweep_secs),
            max_sessions,
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    for origin in &origins {
        if origin != "*" && HeaderValue::from_str(origin).is_err() {
            return Err(ConfigError::Invalid {
                name: "DBCHAT_CORS_ALLOW_ORIGINS",
                value: origin.clone(),
                reason: "not a valid origin".to_string(),
            });
        }
    }
    Ok(origins)
}
