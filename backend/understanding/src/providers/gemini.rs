use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use meterlens_core::{AnalysisError, AnalysisRequest, ApiKey, InferenceBackend, InferenceResponse};

use crate::schema::{SchemaDialect, to_json_schema};

/// Google Gemini `generateContent` backend.
pub struct GeminiBackend {
    client: Client,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl InferenceBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
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

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: &request.image.mime_type,
                            data: &request.image.data_base64,
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(&request.instructions),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: to_json_schema(&request.output_shape, SchemaDialect::Gemini),
            },
        };

        debug!(model = %self.model, "Sending request to Gemini");

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(format!("Gemini HTTP request failed: {e}")))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(format!("Failed to read Gemini response: {e}")))?;
        if !status.is_success() {
            return Err(AnalysisError::Transport(format!("Gemini returned {status}: {raw}")));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw).map_err(|e| {
            AnalysisError::Transport(format!("Unexpected Gemini response envelope: {e}"))
        })?;

        let candidate = parsed.candidates.into_iter().next();
        let finish_reason = candidate
            .as_ref()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "none".to_string());
        let text: String = candidate
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::parse(
                format!("Gemini returned no text (finish reason: {finish_reason})"),
                raw,
            ));
        }

        Ok(InferenceResponse {
            text,
            provider: "gemini".to_string(),
            model: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
    use meterlens_core::{EncodedImage, FailureKind, OutputShape};
    use serde_json::json;

    #[derive(Clone, Default)]
    struct Captured {
        body: Arc<Mutex<Option<Value>>>,
        api_key: Arc<Mutex<Option<String>>>,
    }

    async fn fake_gemini(status: StatusCode, reply: Value) -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route(
                "/models/:call",
                post(
                    move |State(captured): State<Captured>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            *captured.body.lock().unwrap() = Some(body);
                            *captured.api_key.lock().unwrap() = headers
                                .get("x-goog-api-key")
                                .and_then(|v| v.to_str().ok())
                                .map(String::from);
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            image: EncodedImage {
                mime_type: "image/jpeg".into(),
                data_base64: "aGVsbG8=".into(),
            },
            instructions: "Read the meter.".into(),
            output_shape: OutputShape::standard(),
        }
    }

    fn key() -> ApiKey {
        ApiKey::new("test-key").unwrap()
    }

    #[tokio::test]
    async fn sends_image_prompt_and_schema() {
        let reply = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"reading\":" }, { "text": "\"1\"}" }] },
                "finishReason": "STOP"
            }]
        });
        let (url, captured) = fake_gemini(StatusCode::OK, reply).await;
        let backend = GeminiBackend::new("gemini-2.5-flash").with_base_url(url);

        let response = backend.generate(&key(), &request()).await.unwrap();
        assert_eq!(response.text, "{\"reading\":\"1\"}");
        assert_eq!(response.provider, "gemini");

        let body = captured.body.lock().unwrap().clone().unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(parts[1]["text"], "Read the meter.");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["required"][3], "reading");
        assert_eq!(captured.api_key.lock().unwrap().as_deref(), Some("test-key"));
    }

    #[tokio::test]
    async fn http_failure_is_transport_error() {
        let (url, _) =
            fake_gemini(StatusCode::SERVICE_UNAVAILABLE, json!({"error": "overloaded"})).await;
        let backend = GeminiBackend::new("gemini-2.5-flash").with_base_url(url);

        let err = backend.generate(&key(), &request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn blocked_response_is_parse_error() {
        let reply = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        let (url, _) = fake_gemini(StatusCode::OK, reply).await;
        let backend = GeminiBackend::new("gemini-2.5-flash").with_base_url(url);

        let err = backend.generate(&key(), &request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let backend = GeminiBackend::new("gemini-2.5-flash").with_base_url("http://127.0.0.1:9");
        let err = backend.generate(&key(), &request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
    }
}
