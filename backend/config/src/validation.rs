//! Config validation with path-tagged errors and warnings.

use crate::schema::MeterLensConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Emit every finding through `tracing`.
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &MeterLensConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_provider(config, &mut report);
    validate_server(config, &mut report);
    validate_analysis(config, &mut report);
    report
}

fn validate_provider(config: &MeterLensConfig, report: &mut ValidationReport) {
    let provider = &config.provider;
    if provider.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
        report.error("provider.model", "Model cannot be empty");
    }
    if let Some(url) = &provider.base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error("provider.baseUrl", "Base URL must start with http:// or https://");
        }
    }
    // A missing key is not fatal here; analysis fails fast when it is attempted.
    if !provider.has_api_key() {
        report.warn(
            "provider.apiKey",
            format!("No credential configured for {}; analysis will fail", provider.kind()),
        );
    }
}

fn validate_server(config: &MeterLensConfig, report: &mut ValidationReport) {
    if config.server.port == Some(0) {
        report.warn("server.port", "Port 0 binds an ephemeral port");
    }
    if config
        .server
        .bind_address
        .as_deref()
        .is_some_and(|b| b.trim().is_empty())
    {
        report.error("server.bindAddress", "Bind address cannot be empty");
    }
}

fn validate_analysis(config: &MeterLensConfig, report: &mut ValidationReport) {
    if let Some(path) = &config.analysis.prompt_path {
        if !path.exists() {
            report.error(
                "analysis.promptPath",
                format!("Prompt file not found: {}", path.display()),
            );
        }
    }
}
