//! Core types for logscan-core.
//!
//! This module defines the data model shared by the client and the engine:
//! the processing [`Job`] and its [`JobStatus`], the [`LogEntry`] rows returned
//! by a search, and the small enums that travel over the wire as strings.

use crate::error::ParseError;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Lifecycle state of a server-side processing job.
///
/// Transmitted as the uppercase strings `PENDING`, `PROCESSING`, `COMPLETED`,
/// `FAILED` and `CANCELLED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// `COMPLETED`, `FAILED` and `CANCELLED` never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            _ => Err(ParseError::Status(s.to_string())),
        }
    }
}

/// What the upload endpoint hands back: enough to start tracking a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    pub job_id: String,
    pub file_name: String,
    pub file_size: u64,
    /// The full `data` object of the upload response, kept for callers that
    /// need fields this client does not model.
    pub raw: serde_json::Value,
}

/// Status telemetry reported by the status endpoint.
///
/// Replaced wholesale on every successful poll; the client never merges two
/// reports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobProgress {
    #[serde(deserialize_with = "null_as_default")]
    pub status: JobStatus,
    /// Percent complete, 0–100.
    #[serde(deserialize_with = "null_as_default")]
    pub progress: f64,
    pub message: Option<String>,
    /// Failure detail, present on some FAILED reports.
    pub error: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub total_lines: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub processed_lines: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub successful_lines: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub failed_lines: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub lines_per_second: f64,
    pub started_at: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

/// One processing task as seen by the client.
///
/// `job_id`, `file_name` and `file_size` are fixed at creation; `telemetry`
/// holds the latest status report, if any poll has succeeded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub telemetry: Option<JobProgress>,
}

impl Job {
    pub fn from_handle(handle: &JobHandle) -> Self {
        Self {
            job_id: handle.job_id.clone(),
            file_name: handle.file_name.clone(),
            file_size: handle.file_size,
            telemetry: None,
        }
    }

    /// Status of the latest report; `PENDING` until the first poll lands.
    pub fn status(&self) -> JobStatus {
        self.telemetry
            .as_ref()
            .map(|t| t.status)
            .unwrap_or_default()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn progress(&self) -> f64 {
        self.telemetry.as_ref().map(|t| t.progress).unwrap_or(0.0)
    }

    /// Replace the telemetry with a fresh report.
    pub fn apply(&mut self, report: JobProgress) {
        self.telemetry = Some(report);
    }

    /// The file name reported by the service, falling back to the one
    /// recorded at upload time.
    pub fn display_file_name(&self) -> &str {
        self.telemetry
            .as_ref()
            .and_then(|t| t.file_name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.file_name)
    }

    pub fn display_file_size(&self) -> u64 {
        self.telemetry
            .as_ref()
            .and_then(|t| t.file_size)
            .filter(|size| *size > 0)
            .unwrap_or(self.file_size)
    }

    /// Human-readable status detail. Failures prefer the `error` field.
    pub fn detail(&self) -> Option<&str> {
        let t = self.telemetry.as_ref()?;
        if matches!(t.status, JobStatus::Failed | JobStatus::Cancelled) {
            t.error.as_deref().or(t.message.as_deref())
        } else {
            t.message.as_deref()
        }
    }

    /// Time since `startedAt`, formatted as `42s` or `3m 7s`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<String> {
        let started = self.telemetry.as_ref()?.started_at.as_deref()?;
        let started = parse_service_timestamp(started)?;
        let secs = (now - started).num_seconds().max(0);
        if secs < 60 {
            Some(format!("{secs}s"))
        } else {
            Some(format!("{}m {}s", secs / 60, secs % 60))
        }
    }
}

/// Parse a timestamp as the service emits it: RFC 3339, or a local date-time
/// without offset.
fn parse_service_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Format a byte count as `B`, `KB` or `MB` with two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    if bytes == 0 {
        "0 B".to_string()
    } else if bytes < KB {
        format!("{bytes} B")
    } else if bytes < KB * KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / (KB * KB) as f64)
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// Log severity level as classified by the processing service.
///
/// Declaration order is severity order, most severe first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(ParseError::Level(s.to_string())),
        }
    }
}

/// One row of a search result. Read-only from the client's side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub line_number: u64,
    pub timestamp: Option<String>,
    pub level: Option<LogLevel>,
    pub logger: Option<String>,
    pub thread: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    pub stack_trace: Option<String>,
    pub raw_line: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub has_stack_trace: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub has_error: bool,
}

/// The service sends `null` for counters and flags it has not filled in yet.
/// Read those as the field's default, the same as a missing key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Entry ids are strings in some store backends and integers in others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Result pages and aggregates
// ---------------------------------------------------------------------------

/// Aggregate returned alongside a page when `includeSummary` was requested.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub level_counts: BTreeMap<String, u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultPage {
    pub logs: Vec<LogEntry>,
    /// Matching rows across all pages.
    pub total_elements: u64,
    pub summary: Option<SearchSummary>,
}

/// Whole-job statistics from the job summary endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub total_entries: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub error_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub warning_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub stack_trace_count: u64,
    pub earliest_timestamp: Option<String>,
    pub latest_timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Distinct logger and thread names present in a job's results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailableFields {
    #[serde(deserialize_with = "null_as_default")]
    pub loggers: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub threads: Vec<String>,
}

// ---------------------------------------------------------------------------
// Wire enums for upload and export
// ---------------------------------------------------------------------------

/// Export payload format, sent as the `format` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Ndjson,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Ndjson => "ndjson",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "ndjson" => Ok(ExportFormat::Ndjson),
            _ => Err(ParseError::ExportFormat(s.to_string())),
        }
    }
}

/// Timestamp layout hint sent with an upload so the service can parse lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    #[default]
    Iso8601,
    /// `YYYY-MM-DD HH:mm:ss`
    DateTime,
    /// `DD/MM/YYYY HH:mm:ss`
    DayFirst,
    Custom(String),
}

impl TimestampFormat {
    pub fn as_str(&self) -> &str {
        match self {
            TimestampFormat::Iso8601 => "ISO 8601",
            TimestampFormat::DateTime => "YYYY-MM-DD HH:mm:ss",
            TimestampFormat::DayFirst => "DD/MM/YYYY HH:mm:ss",
            TimestampFormat::Custom(pattern) => pattern.as_str(),
        }
    }

    /// The value to send, or `None` when a custom pattern was left blank.
    pub fn wire_value(&self) -> Option<&str> {
        let value = self.as_str().trim();
        (!value.is_empty()).then_some(value)
    }
}

impl From<&str> for TimestampFormat {
    fn from(s: &str) -> Self {
        match s.trim() {
            "ISO 8601" | "iso8601" | "iso" => TimestampFormat::Iso8601,
            "YYYY-MM-DD HH:mm:ss" => TimestampFormat::DateTime,
            "DD/MM/YYYY HH:mm:ss" => TimestampFormat::DayFirst,
            other => TimestampFormat::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
