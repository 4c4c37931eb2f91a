//! Errors raised when parsing user-supplied values into core types.

/// A textual value could not be mapped onto one of the core enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown log level {0:?} (expected ERROR, WARN, INFO, DEBUG or TRACE)")]
    Level(String),
    #[error("unknown job status {0:?}")]
    Status(String),
    #[error("unknown sort direction {0:?} (expected asc or desc)")]
    Direction(String),
    #[error("unknown export format {0:?} (expected csv, json or ndjson)")]
    ExportFormat(String),
    #[error("invalid timestamp {value:?}: {reason}")]
    Timestamp { value: String, reason: String },
}
