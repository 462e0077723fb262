//! Environment overlay for config values.
//!
//! Environment variables win over the config file. The credential is read
//! here once, at startup, and handed to the analyzer explicitly.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::schema::{MeterLensConfig, ProviderKind};

pub const ENV_CONFIG_PATH: &str = "METERLENS_CONFIG";
pub const ENV_PROVIDER: &str = "METERLENS_PROVIDER";
pub const ENV_MODEL: &str = "METERLENS_MODEL";
pub const ENV_BASE_URL: &str = "METERLENS_BASE_URL";
pub const ENV_BIND: &str = "METERLENS_BIND";
pub const ENV_PORT: &str = "METERLENS_PORT";
pub const ENV_PROMPT: &str = "METERLENS_PROMPT";
pub const ENV_LOG_DIR: &str = "METERLENS_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "RUST_LOG";

/// Generic credential variable, checked after the provider-specific one.
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Error returned for env values that cannot be interpreted.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value {value:?} for env var {var_name}: {reason}")]
pub struct InvalidEnvVarError {
    pub var_name: String,
    pub value: String,
    pub reason: String,
}

/// Credential variables to try for a provider, in order.
pub fn credential_vars(kind: ProviderKind) -> [&'static str; 2] {
    match kind {
        ProviderKind::Gemini => [ENV_GEMINI_API_KEY, ENV_API_KEY],
        ProviderKind::OpenAi => [ENV_OPENAI_API_KEY, ENV_API_KEY],
    }
}

/// Overlay the process environment onto a config.
pub fn apply_env(config: MeterLensConfig) -> Result<MeterLensConfig> {
    apply_env_with(config, &std::env::vars().collect())
}

/// Overlay a provided environment map (useful for testing).
pub fn apply_env_with(
    mut config: MeterLensConfig,
    env: &HashMap<String, String>,
) -> Result<MeterLensConfig> {
    let get = |name: &str| env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    // Provider kind first: it decides which credential variable applies.
    if let Some(raw) = get(ENV_PROVIDER) {
        let Some(kind) = ProviderKind::parse(raw) else {
            bail!(InvalidEnvVarError {
                var_name: ENV_PROVIDER.into(),
                value: raw.into(),
                reason: "expected gemini or openai".into(),
            });
        };
        config.provider.kind = Some(kind);
    }
    if let Some(model) = get(ENV_MODEL) {
        config.provider.model = Some(model.to_string());
    }
    if let Some(url) = get(ENV_BASE_URL) {
        config.provider.base_url = Some(url.to_string());
    }
    if let Some(key) = credential_vars(config.provider.kind()).into_iter().find_map(|name| get(name)) {
        config.provider.api_key = Some(key.to_string());
    }

    if let Some(bind) = get(ENV_BIND) {
        config.server.bind_address = Some(bind.to_string());
    }
    if let Some(raw) = get(ENV_PORT) {
        let port = raw.parse::<u16>().map_err(|e| InvalidEnvVarError {
            var_name: ENV_PORT.into(),
            value: raw.into(),
            reason: e.to_string(),
        })?;
        config.server.port = Some(port);
    }

    if let Some(path) = get(ENV_PROMPT) {
        config.analysis.prompt_path = Some(path.into());
    }
    if let Some(dir) = get(ENV_LOG_DIR) {
        config.logging.log_dir = Some(dir.into());
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = Some(level.to_string());
    }

    Ok(config)
}
