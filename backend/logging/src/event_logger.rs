//! Analysis Event Logger
//!
//! Structured events for each analysis attempt, emitted through `tracing`
//! under the `analysis_events` target so the JSON file layer captures them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::{redact_sensitive_data, truncate_for_log};

/// Longest raw model output kept in a log line.
const MAX_RAW_CHARS: usize = 2_000;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    Started {
        file_name: String,
        mime_type: String,
        provider: String,
        model: String,
    },
    Succeeded {
        provider: String,
        latency_ms: u64,
    },
    Failed {
        kind: String,
        error_msg: String,
    },
    /// Model output that could not be parsed; kept for diagnosis only.
    UnparsedResponse {
        raw: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub attempt_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AnalysisEvent,
}

pub struct AnalysisEventLogger;

impl AnalysisEventLogger {
    /// Redact and emit one event.
    pub fn log_event(attempt_id: &str, event: AnalysisEvent) -> EventLogEntry {
        let event = match event {
            AnalysisEvent::Failed { kind, error_msg } => AnalysisEvent::Failed {
                kind,
                error_msg: redact_sensitive_data(&error_msg),
            },
            AnalysisEvent::UnparsedResponse { raw } => AnalysisEvent::UnparsedResponse {
                raw: truncate_for_log(&redact_sensitive_data(&raw), MAX_RAW_CHARS),
            },
            other => other,
        };

        let entry = EventLogEntry {
            attempt_id: attempt_id.into(),
            timestamp: Utc::now(),
            event,
        };

        match &entry.event {
            AnalysisEvent::Failed { .. } | AnalysisEvent::UnparsedResponse { .. } => {
                warn!(target: "analysis_events", event = ?entry, "Analysis event");
            }
            _ => info!(target: "analysis_events", event = ?entry, "Analysis event"),
        }
        entry
    }
}
