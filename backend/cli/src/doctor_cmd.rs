//! CLI Doctor Command
//!
//! Reports where config came from, which backend will be called, and whether
//! a credential is present. Secrets are masked.

use std::path::Path;

use meterlens_config::{
    credential_vars, mask_secret, redact_config, MeterLensConfig, ValidationReport,
};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

/// Run all checks. Returns `true` when nothing blocks analysis.
pub fn run(config_path: &Path, config: &MeterLensConfig, report: &ValidationReport) -> bool {
    println!("\nRunning MeterLens doctor...\n");

    if config_path.exists() {
        note_info(&format!("Config file: {}", config_path.display()));
    } else {
        note_info(&format!(
            "Config file: {} (not found, using defaults)",
            config_path.display()
        ));
    }

    let provider = &config.provider;
    note_info(&format!("Provider: {}", provider.kind()));
    note_info(&format!("Model: {}", provider.model.as_deref().unwrap_or("-")));
    note_info(&format!(
        "Endpoint: {}",
        provider.base_url.as_deref().unwrap_or("-")
    ));
    match &config.analysis.prompt_path {
        Some(path) => note_info(&format!("Instructions: {}", path.display())),
        None => note_info("Instructions: built-in"),
    }

    let credential_ok = check_credential(config);

    for warning in report.warnings.iter().filter(|w| w.path != "provider.apiKey") {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }

    if let Ok(effective) = serde_json::to_string_pretty(&redact_config(config)) {
        println!("\nEffective config:\n{effective}");
    }

    println!();
    let healthy = credential_ok && report.is_valid();
    if healthy {
        note_success("All checks passed.");
    } else {
        note_error("Some checks failed. Please fix the problems above.");
    }
    healthy
}

fn check_credential(config: &MeterLensConfig) -> bool {
    let vars = credential_vars(config.provider.kind()).join(" or ");
    match config.provider.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => {
            note_success(&format!("API key: {}", mask_secret(key)));
            true
        }
        _ => {
            note_error(&format!("API key: missing (set {vars})"));
            false
        }
    }
}
