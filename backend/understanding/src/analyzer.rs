//! Meter analyzer: one image in, one structured result out.
//!
//! Each `analyze` call is independent. The analyzer keeps no per-call state,
//! so a single instance can be shared across tasks behind an `Arc`.

use std::sync::Arc;

use anyhow::Result;
use meterlens_config::MeterLensConfig;
use meterlens_core::{
    AnalysisError, AnalysisRequest, AnalysisResult, ApiKey, InferenceBackend, OutputShape,
    SelectedImage,
};
use meterlens_logging::{AnalysisEvent, AnalysisEventLogger};
use tracing::info;
use uuid::Uuid;

use crate::encoding::encode_image;
use crate::prompt::Instructions;
use crate::providers::build_backend;
use crate::schema::parse_result;

pub struct MeterAnalyzer {
    backend: Arc<dyn InferenceBackend>,
    credential: Option<ApiKey>,
    instructions: Instructions,
    output_shape: OutputShape,
}

impl MeterAnalyzer {
    pub fn new(backend: Arc<dyn InferenceBackend>, credential: Option<ApiKey>) -> Self {
        let output_shape = OutputShape::standard();
        Self {
            backend,
            credential,
            instructions: Instructions::default_for(&output_shape),
            output_shape,
        }
    }

    /// Build from a prepared config: backend, credential, prompt file and shape.
    pub fn from_config(config: &MeterLensConfig) -> Result<Self> {
        let output_shape = if config.analysis.with_authority() {
            OutputShape::with_authority()
        } else {
            OutputShape::standard()
        };
        let instructions = match &config.analysis.prompt_path {
            Some(path) => Instructions::from_file(path)?,
            None => Instructions::default_for(&output_shape),
        };
        let credential = config.provider.api_key.as_deref().and_then(ApiKey::new);

        Ok(Self::new(build_backend(&config.provider), credential)
            .with_output_shape(output_shape)
            .with_instructions(instructions))
    }

    pub fn with_instructions(mut self, instructions: Instructions) -> Self {
        self.instructions = instructions;
        self
    }

    /// Replace the output shape. Instructions are left as they are; pair with
    /// `with_instructions` when the new shape adds fields.
    pub fn with_output_shape(mut self, shape: OutputShape) -> Self {
        self.output_shape = shape;
        self
    }

    pub fn instructions(&self) -> &Instructions {
        &self.instructions
    }

    pub fn output_shape(&self) -> &OutputShape {
        &self.output_shape
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Run one analysis attempt. Exactly one backend call on the happy path,
    /// none when the credential is missing or the image cannot be read.
    pub async fn analyze(&self, image: &SelectedImage) -> Result<AnalysisResult, AnalysisError> {
        let attempt_id = Uuid::new_v4().to_string();
        let outcome = self.run(&attempt_id, image).await;

        if let Err(err) = &outcome {
            if let AnalysisError::Parse { raw, .. } = err {
                AnalysisEventLogger::log_event(
                    &attempt_id,
                    AnalysisEvent::UnparsedResponse { raw: raw.clone() },
                );
            }
            AnalysisEventLogger::log_event(
                &attempt_id,
                AnalysisEvent::Failed {
                    kind: format!("{:?}", err.kind()),
                    error_msg: err.to_string(),
                },
            );
        }
        outcome
    }

    async fn run(
        &self,
        attempt_id: &str,
        image: &SelectedImage,
    ) -> Result<AnalysisResult, AnalysisError> {
        let Some(credential) = &self.credential else {
            return Err(AnalysisError::Configuration(
                "no API key configured for the inference service".to_string(),
            ));
        };

        AnalysisEventLogger::log_event(
            attempt_id,
            AnalysisEvent::Started {
                file_name: image.file_name.clone(),
                mime_type: image.mime_type.clone(),
                provider: self.backend.name().to_string(),
                model: self.backend.model().to_string(),
            },
        );

        let encoded = encode_image(image).await?;
        let request = AnalysisRequest {
            image: encoded,
            instructions: self.instructions.as_str().to_string(),
            output_shape: self.output_shape.clone(),
        };

        let response = self.backend.generate(credential, &request).await?;
        let result = parse_result(&response.text, &self.output_shape)?;

        info!(
            provider = %response.provider,
            model = %response.model,
            latency_ms = response.latency_ms,
            "Meter analysis succeeded"
        );
        AnalysisEventLogger::log_event(
            attempt_id,
            AnalysisEvent::Succeeded {
                provider: response.provider,
                latency_ms: response.latency_ms,
            },
        );
        Ok(result)
    }
}
