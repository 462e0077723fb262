use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use meterlens_core::{AnalysisError, AnalysisRequest, ApiKey, InferenceBackend, InferenceResponse};

use crate::schema::{SchemaDialect, to_json_schema};

/// OpenAI-compatible chat completions backend with strict JSON-schema output.
pub struct OpenAiBackend {
    client: Client,
    model: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[async_trait]
impl InferenceBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        credential: &ApiKey,
        request: &AnalysisRequest,
    ) -> Result<InferenceResponse, AnalysisError> {
        let start = Instant::now();

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": request.instructions },
                    { "type": "image_url", "image_url": { "url": request.image.data_url() } }
                ]
            }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "meter_reading",
                    "strict": true,
                    "schema": to_json_schema(&request.output_shape, SchemaDialect::OpenAi),
                }
            }
        });

        debug!(model = %self.model, "Sending request to OpenAI");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(format!("OpenAI HTTP request failed: {e}")))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(format!("Failed to read OpenAI response: {e}")))?;
        if !status.is_success() {
            return Err(AnalysisError::Transport(format!("OpenAI returned {status}: {raw}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&raw).map_err(|e| {
            AnalysisError::Transport(format!("Unexpected OpenAI response envelope: {e}"))
        })?;

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(AnalysisError::parse("OpenAI returned no choices", raw));
        };
        if let Some(refusal) = choice.message.refusal {
            return Err(AnalysisError::parse(format!("model refused: {refusal}"), raw));
        }
        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            let reason = choice.finish_reason.unwrap_or_else(|| "none".to_string());
            return Err(AnalysisError::parse(
                format!("OpenAI returned no content (finish reason: {reason})"),
                raw,
            ));
        }

        Ok(InferenceResponse {
            text,
            provider: "openai".to_string(),
            model: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
