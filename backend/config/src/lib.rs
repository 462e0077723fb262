//! `meterlens-config`: MeterLens runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, provider, analysis, logging)
//! - YAML loading from the platform config directory
//! - Environment overlay, including credential lookup
//! - Default value application
//! - Validation and redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env, apply_env_with, credential_vars, InvalidEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use redact::{mask_secret, redact, redact_config};
pub use schema::{
    AnalysisConfig, LoggingConfig, MeterLensConfig, ProviderConfig, ProviderKind, ServerConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load the config file, overlay the environment, apply defaults, and validate.
///
/// This is the main entry point for loading a config at runtime. The config
/// is returned together with its validation report; callers decide whether
/// errors are fatal.
pub async fn load_and_prepare(path: &Path) -> Result<(MeterLensConfig, ValidationReport)> {
    let config = load_config(path).await?;
    let config = apply_env(config).context("Failed to apply environment overrides")?;
    let config = apply_all_defaults(config);
    let report = validate(&config);
    Ok((config, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, report) = load_and_prepare(&dir.path().join("absent.yaml"))
            .await
            .unwrap();
        assert!(config.server.port.is_some());
        assert!(config.provider.model.is_some());
        assert!(report.is_valid());
    }
}
