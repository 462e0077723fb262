use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown for any response that does not match the declared output shape.
pub const PARSE_FAILURE_MESSAGE: &str = "Could not process the AI response. Please try again.";

/// Message shown when analysis is triggered with nothing selected.
pub const NO_IMAGE_MESSAGE: &str = "Please select an image first.";

/// Every way a single analysis attempt can fail.
///
/// All variants are terminal for the attempt. Nothing is retried.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing credential or unusable configuration. Raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No image selected, or a file outside the accepted image types.
    #[error("{0}")]
    UserInput(String),

    /// The image could not be read from its source.
    #[error("failed to read image: {0}")]
    Read(String),

    /// The call to the inference service itself failed.
    #[error("inference request failed: {0}")]
    Transport(String),

    /// A response arrived but does not conform to the declared output shape.
    /// `raw` is kept for logs only.
    #[error("could not parse model response: {reason}")]
    Parse { reason: String, raw: String },
}

/// Coarse failure category, safe to serialize into UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    UserInput,
    Read,
    Transport,
    Parse,
}

impl AnalysisError {
    pub fn parse(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration(_) => FailureKind::Configuration,
            Self::UserInput(_) => FailureKind::UserInput,
            Self::Read(_) => FailureKind::Read,
            Self::Transport(_) => FailureKind::Transport,
            Self::Parse { .. } => FailureKind::Parse,
        }
    }

    /// Human-readable message for the presentation layer.
    ///
    /// Parse failures collapse to a generic message so raw model output never
    /// reaches the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse { .. } => PARSE_FAILURE_MESSAGE.to_string(),
            Self::UserInput(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
