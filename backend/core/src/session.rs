//! Session state for one user of the meter reader.
//!
//! Tracks the selected image, its preview, and the outcome of the latest
//! analysis attempt. Each attempt moves Idle → Requesting → {Succeeded, Failed};
//! a new attempt may start from either terminal state and discards the old outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::{AnalysisError, FailureKind, NO_IMAGE_MESSAGE};
use crate::types::{AnalysisResult, PreviewHandle, SelectedImage};

/// Error shown to the user for a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorView {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&AnalysisError> for ErrorView {
    fn from(err: &AnalysisError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

/// Serializable snapshot of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub has_image: bool,
    pub file_name: Option<String>,
    pub preview: Option<PreviewHandle>,
    pub is_busy: bool,
    pub result: Option<AnalysisResult>,
    pub error: Option<ErrorView>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BeginError {
    #[error("{}", NO_IMAGE_MESSAGE)]
    NoImage,
    #[error("an analysis is already in progress")]
    InFlight,
}

/// Identifies one in-flight attempt. Completions carrying an outdated
/// ticket are discarded.
#[derive(Debug, Clone)]
pub struct AttemptTicket {
    pub attempt: u64,
    pub image: SelectedImage,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Requesting,
    Succeeded(AnalysisResult),
    Failed(ErrorView),
}

#[derive(Debug)]
pub struct AnalysisSession {
    image: Option<SelectedImage>,
    preview: Option<PreviewHandle>,
    phase: Phase,
    attempt: u64,
    completed_at: Option<DateTime<Utc>>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            image: None,
            preview: None,
            phase: Phase::Idle,
            attempt: 0,
            completed_at: None,
        }
    }

    /// Select a new image, clearing any prior result or error.
    ///
    /// Returns the displaced preview so the caller can release it. An attempt
    /// still in flight becomes stale.
    pub fn select_image(
        &mut self,
        image: SelectedImage,
        preview: PreviewHandle,
    ) -> Option<PreviewHandle> {
        if matches!(self.phase, Phase::Requesting) {
            self.attempt += 1;
        }
        debug!(file = %image.file_name, mime = %image.mime_type, "Image selected");
        self.image = Some(image);
        self.phase = Phase::Idle;
        self.completed_at = None;
        self.preview.replace(preview)
    }

    /// Start an attempt.
    ///
    /// With no image selected this records the "select an image first" error
    /// and fails without producing a ticket.
    pub fn begin_analysis(&mut self) -> Result<AttemptTicket, BeginError> {
        if matches!(self.phase, Phase::Requesting) {
            return Err(BeginError::InFlight);
        }
        let Some(image) = self.image.clone() else {
            let err = AnalysisError::UserInput(NO_IMAGE_MESSAGE.to_string());
            self.phase = Phase::Failed(ErrorView::from(&err));
            self.completed_at = Some(Utc::now());
            return Err(BeginError::NoImage);
        };

        self.attempt += 1;
        self.phase = Phase::Requesting;
        self.completed_at = None;
        Ok(AttemptTicket {
            attempt: self.attempt,
            image,
        })
    }

    /// Apply the outcome of an attempt. Returns `false` if the ticket is stale
    /// and the outcome was dropped.
    pub fn complete(
        &mut self,
        ticket: &AttemptTicket,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> bool {
        if ticket.attempt != self.attempt || !matches!(self.phase, Phase::Requesting) {
            debug!(
                attempt = ticket.attempt,
                current = self.attempt,
                "Discarding stale analysis outcome"
            );
            return false;
        }

        self.phase = match outcome {
            Ok(result) => Phase::Succeeded(result),
            Err(err) => Phase::Failed(ErrorView::from(&err)),
        };
        self.completed_at = Some(Utc::now());
        true
    }

    /// Return to the initial state. Returns the preview to release.
    pub fn reset(&mut self) -> Option<PreviewHandle> {
        self.attempt += 1;
        self.image = None;
        self.phase = Phase::Idle;
        self.completed_at = None;
        self.preview.take()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Requesting)
    }

    pub fn is_idle(&self) -> bool {
        self.image.is_none() && self.preview.is_none() && matches!(self.phase, Phase::Idle)
    }

    pub fn view(&self) -> UiState {
        let (result, error) = match &self.phase {
            Phase::Succeeded(result) => (Some(result.clone()), None),
            Phase::Failed(error) => (None, Some(error.clone())),
            Phase::Idle | Phase::Requesting => (None, None),
        };
        UiState {
            has_image: self.image.is_some(),
            file_name: self.image.as_ref().map(|i| i.file_name.clone()),
            preview: self.preview.clone(),
            is_busy: self.is_busy(),
            result,
            error,
            completed_at: self.completed_at,
        }
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
