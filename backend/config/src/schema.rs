//! MeterLens configuration schema.
//!
//! Every leaf is optional so a partial YAML file deserializes; `defaults`
//! fills the gaps and the accessors below read the filled values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::defaults::{DEFAULT_BIND_ADDRESS, DEFAULT_LOG_LEVEL, DEFAULT_PORT};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterLensConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!(
            "{}:{}",
            self.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Which inference service to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" | "open-ai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => f.write_str("gemini"),
            Self::OpenAi => f.write_str("openai"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Usually supplied by the environment rather than the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        self.kind.unwrap_or_default()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// File holding a replacement instruction payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_path: Option<PathBuf>,
    /// Request the utility-authority field in addition to the standard ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_authority: Option<bool>,
}

impl AnalysisConfig {
    pub fn with_authority(&self) -> bool {
        self.with_authority.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling NDJSON logs; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_yaml() {
        let yaml = "provider:\n  kind: openai\n  model: gpt-4o-mini\nserver:\n  port: 9000\n";
        let cfg: MeterLensConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.provider.kind(), ProviderKind::OpenAi);
        assert_eq!(cfg.provider.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(cfg.server.addr(), "127.0.0.1:9000");
        assert!(cfg.analysis.prompt_path.is_none());
    }

    #[test]
    fn parses_camel_case_keys() {
        let yaml = "analysis:\n  promptPath: /etc/meterlens/prompt.txt\n  withAuthority: true\n";
        let cfg: MeterLensConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.analysis.with_authority());
        assert_eq!(
            cfg.analysis.prompt_path.unwrap(),
            PathBuf::from("/etc/meterlens/prompt.txt")
        );
    }

    #[test]
    fn provider_kind_parse_is_lenient() {
        assert_eq!(ProviderKind::parse(" Google "), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::parse("OPENAI"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("ollama"), None);
    }
}
