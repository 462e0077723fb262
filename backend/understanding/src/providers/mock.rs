use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use meterlens_core::{
    AnalysisError, AnalysisRequest, ApiKey, FailureKind, InferenceBackend, InferenceResponse,
};

enum Reply {
    Text(String),
    Fail(FailureKind, String),
}

/// Offline backend that answers every call with the same canned reply.
///
/// Counts calls so tests can assert that nothing reached the service.
pub struct MockBackend {
    reply: Reply,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Reply with `text` on every call.
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Reply::Text(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call with an error of `kind`.
    pub fn failing(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fail(kind, message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        _credential: &ApiKey,
        _request: &AnalysisRequest,
    ) -> Result<InferenceResponse, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Text(text) => Ok(InferenceResponse {
                text: text.clone(),
                provider: "mock".to_string(),
                model: "mock".to_string(),
                latency_ms: 0,
            }),
            Reply::Fail(kind, message) => Err(match kind {
                FailureKind::Configuration => AnalysisError::Configuration(message.clone()),
                FailureKind::UserInput => AnalysisError::UserInput(message.clone()),
                FailureKind::Read => AnalysisError::Read(message.clone()),
                FailureKind::Transport => AnalysisError::Transport(message.clone()),
                FailureKind::Parse => AnalysisError::parse(message.clone(), message.clone()),
            }),
        }
    }
}
