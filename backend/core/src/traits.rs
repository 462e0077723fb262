use async_trait::async_trait;

use crate::error::AnalysisError;
use crate::types::{ApiKey, EncodedImage, OutputShape};

/// Trait for external multimodal inference services.
///
/// Implementations issue exactly one network call per `generate` and never retry.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Backend name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Send one request and return the raw response text.
    async fn generate(
        &self,
        credential: &ApiKey,
        request: &AnalysisRequest,
    ) -> Result<InferenceResponse, AnalysisError>;
}

/// One analysis request: encoded image, instructions, and output shape.
///
/// Built per attempt and dropped once the call completes.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: EncodedImage,
    pub instructions: String,
    pub output_shape: OutputShape,
}

/// Raw reply from an inference backend.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}
