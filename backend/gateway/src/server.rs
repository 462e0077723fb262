//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use bytes::Bytes;
use meterlens_core::{
    AnalysisError, AnalysisResult, AnalysisSession, AttemptTicket, BeginError, UiState,
};
use meterlens_media::{PreviewStore, image_from_bytes, preview_router};
use meterlens_understanding::MeterAnalyzer;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, instrument, warn};

use crate::api;

/// Largest accepted request body; meter photos from phone cameras fit well below it.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub session: Arc<Mutex<AnalysisSession>>,
    pub previews: PreviewStore,
    pub analyzer: Arc<MeterAnalyzer>,
}

impl GatewayState {
    pub fn new(analyzer: Arc<MeterAnalyzer>) -> Self {
        Self {
            session: Arc::new(Mutex::new(AnalysisSession::new())),
            previews: PreviewStore::new(),
            analyzer,
        }
    }

    pub async fn view(&self) -> UiState {
        self.session.lock().await.view()
    }

    /// Filter, preview and select an uploaded image. The displaced preview is revoked.
    pub async fn select_upload(
        &self,
        file_name: &str,
        declared_mime: Option<&str>,
        data: Bytes,
    ) -> Result<UiState, AnalysisError> {
        let image = image_from_bytes(file_name, declared_mime, data.clone())?;
        let preview = self.previews.register(&image.mime_type, data).await;

        let (displaced, view) = {
            let mut session = self.session.lock().await;
            let displaced = session.select_image(image, preview);
            (displaced, session.view())
        };
        if let Some(old) = displaced {
            self.previews.revoke(&old).await;
        }
        Ok(view)
    }

    /// Run one attempt. The session lock is released for the duration of the
    /// backend call; the outcome is applied only if the attempt is still current.
    ///
    /// If this future is dropped mid-call (client disconnect), the attempt is
    /// completed as a transport failure so the session does not stay busy.
    pub async fn run_analysis(&self) -> Result<UiState, BeginError> {
        let ticket = {
            let mut session = self.session.lock().await;
            match session.begin_analysis() {
                Ok(ticket) => ticket,
                Err(BeginError::NoImage) => return Ok(session.view()),
                Err(err) => return Err(err),
            }
        };

        let image = ticket.image.clone();
        let guard = AttemptGuard {
            session: self.session.clone(),
            ticket: Some(ticket),
        };
        let outcome = self.analyzer.analyze(&image).await;
        Ok(guard.finish(outcome).await)
    }

    pub async fn reset(&self) -> UiState {
        let (preview, view) = {
            let mut session = self.session.lock().await;
            let preview = session.reset();
            (preview, session.view())
        };
        if let Some(preview) = preview {
            self.previews.revoke(&preview).await;
        }
        view
    }
}

/// Owns an in-flight ticket until its outcome is applied.
struct AttemptGuard {
    session: Arc<Mutex<AnalysisSession>>,
    ticket: Option<AttemptTicket>,
}

impl AttemptGuard {
    async fn finish(mut self, outcome: Result<AnalysisResult, AnalysisError>) -> UiState {
        let session = self.session.clone();
        let mut session = session.lock().await;
        if let Some(ticket) = self.ticket.take() {
            if !session.complete(&ticket, outcome) {
                debug!(attempt = ticket.attempt, "Attempt superseded before completion");
            }
        }
        session.view()
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        warn!(attempt = ticket.attempt, "Analysis request dropped before completion");

        if let Ok(mut session) = self.session.try_lock() {
            session.complete(&ticket, Err(abandoned()));
            return;
        }
        let session = self.session.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                session.lock().await.complete(&ticket, Err(abandoned()));
            });
        }
    }
}

fn abandoned() -> AnalysisError {
    AnalysisError::Transport("analysis request was abandoned before a response arrived".to_string())
}

pub fn build_router(state: GatewayState) -> Router {
    let previews = state.previews.clone();
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/state", get(api::get_state))
        .route("/api/image", post(api::upload_image))
        .route("/api/analyze", post(api::analyze))
        .route("/api/reset", post(api::reset))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
        .merge(preview_router(previews))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Starts the main Axum HTTP server for the gateway.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gateway");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use meterlens_core::{
        AnalysisRequest, ApiKey, FailureKind, InferenceBackend, InferenceResponse,
    };
    use meterlens_understanding::MockBackend;

    /// Backend whose call never returns.
    struct HangingBackend;

    #[async_trait]
    impl InferenceBackend for HangingBackend {
        fn name(&self) -> &str {
            "hanging"
        }

        fn model(&self) -> &str {
            "hanging"
        }

        async fn generate(
            &self,
            _credential: &ApiKey,
            _request: &AnalysisRequest,
        ) -> Result<InferenceResponse, AnalysisError> {
            std::future::pending().await
        }
    }

    const REPLY: &str = r#"{"meterSize":"15(45)A","meterType":"rotary-dial","serialNumber":"undetermined","reading":"0452.7","meterCondition":"normal"}"#;

    fn state_with(mock: Arc<MockBackend>) -> GatewayState {
        GatewayState::new(Arc::new(MeterAnalyzer::new(mock, ApiKey::new("test-key"))))
    }

    async fn upload(state: &GatewayState, name: &str) -> UiState {
        state
            .select_upload(name, Some("image/jpeg"), Bytes::from_static(b"\xff\xd8"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upload_sets_preview_and_clears_previous_outcome() {
        let state = state_with(Arc::new(MockBackend::replying(REPLY)));
        upload(&state, "first.jpg").await;
        let analyzed = state.run_analysis().await.unwrap();
        assert!(analyzed.result.is_some());

        let view = upload(&state, "second.jpg").await;
        assert!(view.has_image);
        assert!(view.result.is_none() && view.error.is_none());
        assert!(view.preview.is_some_and(|p| !p.url.is_empty()));
        assert_eq!(state.previews.len().await, 1);
    }

    #[tokio::test]
    async fn rejected_upload_leaves_session_untouched() {
        let state = state_with(Arc::new(MockBackend::replying(REPLY)));
        let err = state
            .select_upload("notes.pdf", Some("application/pdf"), Bytes::from_static(b"%PDF"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::UserInput);
        assert!(state.view().await.preview.is_none());
        assert!(state.previews.is_empty().await);
    }

    #[tokio::test]
    async fn analyze_without_image_makes_no_call() {
        let mock = Arc::new(MockBackend::replying(REPLY));
        let state = state_with(mock.clone());

        let view = state.run_analysis().await.unwrap();
        assert_eq!(mock.calls(), 0);
        let error = view.error.unwrap();
        assert_eq!(error.kind, FailureKind::UserInput);
        assert_eq!(error.message, "Please select an image first.");
    }

    #[tokio::test]
    async fn analyze_populates_result() {
        let state = state_with(Arc::new(MockBackend::replying(REPLY)));
        upload(&state, "meter.jpg").await;

        let view = state.run_analysis().await.unwrap();
        assert!(!view.is_busy);
        let result = view.result.unwrap();
        assert_eq!(result.reading, "0452.7");
        assert_eq!(result.serial_number, "undetermined");
    }

    #[tokio::test]
    async fn failed_analysis_is_reported_in_state() {
        let state = state_with(Arc::new(MockBackend::replying("not json")));
        upload(&state, "meter.jpg").await;

        let view = state.run_analysis().await.unwrap();
        assert!(view.result.is_none());
        assert_eq!(view.error.unwrap().kind, FailureKind::Parse);
    }

    #[tokio::test]
    async fn reset_returns_to_idle_and_revokes_preview() {
        let state = state_with(Arc::new(MockBackend::replying(REPLY)));
        upload(&state, "meter.jpg").await;
        state.run_analysis().await.unwrap();

        let view = state.reset().await;
        assert!(!view.has_image && view.preview.is_none() && view.result.is_none());
        assert!(state.previews.is_empty().await);
        assert!(state.session.lock().await.is_idle());
    }

    #[tokio::test]
    async fn second_attempt_while_busy_is_refused() {
        let mock = Arc::new(MockBackend::replying(REPLY));
        let state = state_with(mock.clone());
        upload(&state, "meter.jpg").await;
        let _ticket = state.session.lock().await.begin_analysis().unwrap();

        assert_eq!(state.run_analysis().await.unwrap_err(), BeginError::InFlight);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn dropped_request_does_not_leave_session_busy() {
        let analyzer = MeterAnalyzer::new(Arc::new(HangingBackend), ApiKey::new("test-key"));
        let state = GatewayState::new(Arc::new(analyzer));
        upload(&state, "meter.jpg").await;

        let in_flight = tokio::spawn({
            let state = state.clone();
            async move { state.run_analysis().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.view().await.is_busy);

        in_flight.abort();
        assert!(in_flight.await.unwrap_err().is_cancelled());

        let view = state.view().await;
        assert!(!view.is_busy);
        assert_eq!(view.error.unwrap().kind, FailureKind::Transport);
        assert!(state.session.lock().await.begin_analysis().is_ok());
    }
}
