//! Structured logging for MeterLens.
//!
//! Handles log redaction, console and rolling JSON output, and per-attempt
//! analysis events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AnalysisEvent, AnalysisEventLogger, EventLogEntry};
pub use logger::init_logger;
pub use redact::{redact_sensitive_data, truncate_for_log};
