//! Export coordinator: fetch the whole filtered result set as a file.
//!
//! An export reuses the session's filters and sort but ignores its pagination:
//! it always asks for the first page with the configured row cap, and never
//! asks for the aggregate summary. Exports are independent of each other and
//! of the session they were started from.

use bytes::Bytes;
use logscan_client::{ClientError, LogService};
use logscan_core::config::ExportConfig;
use logscan_core::{build_search_request, ExportFormat, SearchRequest, SessionState};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An export payload ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// `logs-<jobId>.<format>`, with path separators in the job id replaced.
pub fn export_file_name(job_id: &str, format: ExportFormat) -> String {
    let job_id: String = job_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("logs-{job_id}.{format}")
}

pub struct ExportCoordinator {
    service: Arc<dyn LogService>,
    max_rows: u32,
    output_dir: PathBuf,
}

impl ExportCoordinator {
    pub fn new(service: Arc<dyn LogService>, config: &ExportConfig) -> Self {
        Self {
            service,
            max_rows: config.max_rows.max(1),
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The request sent for an export of `state`: page 1, `max_rows` rows,
    /// no summary.
    pub fn export_request(&self, job_id: &str, state: &SessionState) -> SearchRequest {
        let mut request = build_search_request(job_id, state, Some(1), Some(self.max_rows));
        request.include_summary = None;
        request
    }

    /// Fetch the export payload without saving it.
    pub async fn fetch(
        &self,
        job_id: &str,
        state: &SessionState,
        format: ExportFormat,
    ) -> Result<ExportFile, ClientError> {
        let request = self.export_request(job_id, state);
        tracing::debug!(%job_id, %format, size = request.size, "requesting export");
        let bytes = self
            .service
            .export(job_id, format, &request)
            .await
            .inspect_err(|e| tracing::warn!(%job_id, %format, error = %e, "export failed"))?;
        Ok(ExportFile {
            file_name: export_file_name(job_id, format),
            bytes,
        })
    }

    /// Fetch the payload and write it into the output directory. Returns the
    /// path written. An existing file of the same name is overwritten.
    pub async fn export(
        &self,
        job_id: &str,
        state: &SessionState,
        format: ExportFormat,
    ) -> Result<PathBuf, ClientError> {
        let file = self.fetch(job_id, state, format).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(&file.file_name);
        tokio::fs::write(&path, &file.bytes).await?;
        tracing::info!(%job_id, path = %path.display(), bytes = file.bytes.len(), "export written");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
