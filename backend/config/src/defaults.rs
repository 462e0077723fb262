//! Config defaults: fills every unset field after file load and env overlay.

use crate::schema::{MeterLensConfig, ProviderKind};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Apply all defaults to a loaded config.
pub fn apply_all_defaults(config: MeterLensConfig) -> MeterLensConfig {
    let config = apply_server_defaults(config);
    let config = apply_provider_defaults(config);
    let config = apply_analysis_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: MeterLensConfig) -> MeterLensConfig {
    let server = &mut config.server;
    if server.bind_address.is_none() {
        server.bind_address = Some(DEFAULT_BIND_ADDRESS.to_string());
    }
    if server.port.is_none() {
        server.port = Some(DEFAULT_PORT);
    }
    config
}

/// Model and base URL default per provider kind.
fn apply_provider_defaults(mut config: MeterLensConfig) -> MeterLensConfig {
    let provider = &mut config.provider;
    let kind = *provider.kind.get_or_insert(ProviderKind::default());
    let (model, base_url) = match kind {
        ProviderKind::Gemini => (DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_BASE_URL),
        ProviderKind::OpenAi => (DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_BASE_URL),
    };
    if provider.model.is_none() {
        provider.model = Some(model.to_string());
    }
    if provider.base_url.is_none() {
        provider.base_url = Some(base_url.to_string());
    }
    config
}

fn apply_analysis_defaults(mut config: MeterLensConfig) -> MeterLensConfig {
    if config.analysis.with_authority.is_none() {
        config.analysis.with_authority = Some(false);
    }
    config
}

fn apply_logging_defaults(mut config: MeterLensConfig) -> MeterLensConfig {
    if config.logging.level.is_none() {
        config.logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
