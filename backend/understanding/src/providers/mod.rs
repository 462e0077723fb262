//! Inference backends.

pub mod gemini;
pub mod mock;
pub mod openai;

use std::sync::Arc;

use meterlens_config::defaults::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};
use meterlens_config::{ProviderConfig, ProviderKind};
use meterlens_core::InferenceBackend;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;
pub use openai::OpenAiBackend;

/// Select the configured backend. Unset model or base URL fall back to the
/// provider's defaults.
pub fn build_backend(config: &ProviderConfig) -> Arc<dyn InferenceBackend> {
    match config.kind() {
        ProviderKind::Gemini => {
            let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
            let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_GEMINI_BASE_URL);
            Arc::new(GeminiBackend::new(model).with_base_url(base_url))
        }
        ProviderKind::OpenAi => {
            let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
            let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL);
            Arc::new(OpenAiBackend::new(model).with_base_url(base_url))
        }
    }
}
