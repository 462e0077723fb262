//! JSON handlers for `/api/*`.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meterlens_core::{AnalysisError, BeginError, ErrorView, UiState};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub model: String,
    pub credential_configured: bool,
}

/// Handler for `GET /api/health`
pub async fn health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        service: "meterlens",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.analyzer.backend_name().to_string(),
        model: state.analyzer.model().to_string(),
        credential_configured: state.analyzer.has_credential(),
    })
}

/// Handler for `GET /api/state`
pub async fn get_state(State(state): State<GatewayState>) -> Json<UiState> {
    Json(state.view().await)
}

/// Handler for `POST /api/image`. Takes the first file field of the form.
pub async fn upload_image(State(state): State<GatewayState>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart upload: {}", e);
                return bad_request(&AnalysisError::UserInput(format!("Malformed upload: {e}")));
            }
        };
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                return bad_request(&AnalysisError::Read(format!("{file_name}: {e}")));
            }
        };

        return match state
            .select_upload(&file_name, content_type.as_deref(), data)
            .await
        {
            Ok(view) => Json(view).into_response(),
            Err(err) => bad_request(&err),
        };
    }

    bad_request(&AnalysisError::UserInput(
        "Upload contained no image file.".to_string(),
    ))
}

/// Handler for `POST /api/analyze`. Analysis failures are part of the state,
/// not the status code.
pub async fn analyze(State(state): State<GatewayState>) -> Response {
    match state.run_analysis().await {
        Ok(view) => Json(view).into_response(),
        Err(err @ BeginError::InFlight) => {
            (StatusCode::CONFLICT, Json(json!({ "error": err.to_string() }))).into_response()
        }
        Err(err) => (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() })))
            .into_response(),
    }
}

/// Handler for `POST /api/reset`
pub async fn reset(State(state): State<GatewayState>) -> Json<UiState> {
    Json(state.reset().await)
}

fn bad_request(err: &AnalysisError) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorView::from(err))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use meterlens_core::ApiKey;
    use meterlens_understanding::{MeterAnalyzer, MockBackend};

    fn state(credential: Option<ApiKey>) -> GatewayState {
        let mock = Arc::new(MockBackend::replying("{}"));
        GatewayState::new(Arc::new(MeterAnalyzer::new(mock, credential)))
    }

    #[tokio::test]
    async fn health_reports_backend_and_credential() {
        let Json(report) = health(State(state(None))).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.provider, "mock");
        assert!(!report.credential_configured);
    }

    #[tokio::test]
    async fn analyze_conflicts_while_in_flight() {
        let state = state(ApiKey::new("k"));
        state
            .select_upload("m.png", None, bytes::Bytes::from_static(b"png"))
            .await
            .unwrap();
        let _ticket = state.session.lock().await.begin_analysis().unwrap();

        let response = analyze(State(state)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    async fn serve(state: GatewayState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, crate::server::build_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn file_part(name: &str, mime: &str, data: &'static [u8]) -> reqwest::multipart::Part {
        reqwest::multipart::Part::bytes(data)
            .file_name(name.to_string())
            .mime_str(mime)
            .unwrap()
    }

    #[tokio::test]
    async fn upload_takes_first_file_field_and_serves_preview() {
        let base = serve(state(ApiKey::new("k"))).await;
        let client = reqwest::Client::new();
        let form = reqwest::multipart::Form::new()
            .text("note", "kitchen meter")
            .part("image", file_part("meter.png", "image/png", b"\x89PNG"))
            .part("other", file_part("second.jpg", "image/jpeg", b"\xff\xd8"));

        let response = client
            .post(format!("{base}/api/image"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let view: serde_json::Value = response.json().await.unwrap();
        assert_eq!(view["hasImage"], true);
        assert_eq!(view["fileName"], "meter.png");

        let preview_url = view["preview"]["url"].as_str().unwrap();
        let preview = client.get(format!("{base}{preview_url}")).send().await.unwrap();
        assert_eq!(preview.status(), reqwest::StatusCode::OK);
        assert_eq!(preview.headers()["content-type"], "image/png");
        assert_eq!(preview.bytes().await.unwrap().as_ref(), b"\x89PNG");
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_type() {
        let state = state(ApiKey::new("k"));
        let base = serve(state.clone()).await;
        let form = reqwest::multipart::Form::new()
            .part("image", file_part("notes.pdf", "application/pdf", b"%PDF-1.7"));

        let response = reqwest::Client::new()
            .post(format!("{base}/api/image"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json().await.unwrap();
        assert_eq!(error["kind"], "user_input");
        assert!(!state.view().await.has_image);
        assert!(state.previews.is_empty().await);
    }

    #[tokio::test]
    async fn upload_without_file_part_is_rejected() {
        let base = serve(state(ApiKey::new("k"))).await;
        let form = reqwest::multipart::Form::new().text("note", "no photo attached");

        let response = reqwest::Client::new()
            .post(format!("{base}/api/image"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json().await.unwrap();
        assert_eq!(error["message"], "Upload contained no image file.");
    }

    #[tokio::test]
    async fn malformed_multipart_is_bad_request() {
        let base = serve(state(ApiKey::new("k"))).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/api/image"))
            .header("content-type", "multipart/form-data; boundary=meterlens")
            .body("this is not a multipart body")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json().await.unwrap();
        assert_eq!(error["kind"], "user_input");
    }

    #[tokio::test]
    async fn analyze_without_image_is_ok_with_error_state() {
        let response = analyze(State(state(ApiKey::new("k")))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
