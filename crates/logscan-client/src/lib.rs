//! logscan-client: adapter for the remote log processing service.
//!
//! The engine talks to the service only through the [`LogService`] trait so
//! that tests can substitute an in-memory implementation. [`HttpLogService`]
//! is the real one.

pub mod envelope;
pub mod error;
pub mod http;
pub mod multipart;

pub use error::ClientError;
pub use http::HttpLogService;
pub use multipart::UploadPayload;

use bytes::Bytes;
use logscan_core::{
    AvailableFields, ExportFormat, JobHandle, JobProgress, JobSummary, ResultPage, SearchRequest,
};

/// Default bucket width for [`LogService::timeline`].
pub const DEFAULT_TIMELINE_INTERVAL: &str = "1h";
/// Default cap for [`LogService::field_values`].
pub const DEFAULT_FIELD_VALUE_LIMIT: u32 = 100;
/// Default window for [`LogService::context_lines`].
pub const DEFAULT_CONTEXT_LINES: u32 = 5;

/// Request/response contract of the processing service.
#[async_trait::async_trait]
pub trait LogService: Send + Sync {
    /// Submit a log for processing. `timestamp_format` is sent only when set.
    async fn upload(
        &self,
        payload: &UploadPayload,
        timestamp_format: Option<&str>,
    ) -> Result<JobHandle, ClientError>;

    async fn job_status(&self, job_id: &str) -> Result<JobProgress, ClientError>;

    /// Processed content, raw or unwrapped from its envelope.
    async fn job_result(&self, job_id: &str) -> Result<serde_json::Value, ClientError>;

    async fn search(&self, request: &SearchRequest) -> Result<ResultPage, ClientError>;

    async fn job_summary(&self, job_id: &str) -> Result<JobSummary, ClientError>;

    async fn available_fields(&self, job_id: &str) -> Result<AvailableFields, ClientError>;

    async fn level_distribution(&self, job_id: &str) -> Result<serde_json::Value, ClientError>;

    async fn timeline(&self, job_id: &str, interval: &str)
        -> Result<serde_json::Value, ClientError>;

    async fn field_values(
        &self,
        job_id: &str,
        field: &str,
        limit: u32,
    ) -> Result<serde_json::Value, ClientError>;

    /// Lines surrounding `line_number` in the original file.
    async fn context_lines(
        &self,
        job_id: &str,
        line_number: u64,
        before: u32,
        after: u32,
    ) -> Result<serde_json::Value, ClientError>;

    /// Opaque export payload (CSV, JSON or NDJSON bytes).
    async fn export(
        &self,
        job_id: &str,
        format: ExportFormat,
        request: &SearchRequest,
    ) -> Result<Bytes, ClientError>;
}
