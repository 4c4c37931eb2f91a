//! In-memory [`LogService`] for unit tests.
//!
//! Status reports are scripted per job; searches echo the request's
//! `searchText` back as the single log message so tests can tell which request
//! a displayed page came from.

use bytes::Bytes;
use logscan_client::{ClientError, LogService, UploadPayload};
use logscan_core::{
    AvailableFields, ExportFormat, JobHandle, JobProgress, JobStatus, JobSummary, LogEntry,
    ResultPage, SearchRequest, SearchSummary,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub(crate) struct MockService {
    statuses: Mutex<HashMap<String, VecDeque<Result<JobProgress, String>>>>,
    status_calls: Mutex<Vec<String>>,
    status_delays: Mutex<VecDeque<Duration>>,
    searches: Mutex<Vec<SearchRequest>>,
    search_delays: Mutex<VecDeque<Duration>>,
    fail_searches: AtomicBool,
    exports: Mutex<Vec<(String, ExportFormat, SearchRequest)>>,
    uploads: Mutex<Vec<(UploadPayload, Option<String>)>>,
    reject_uploads: Mutex<Option<String>>,
}

pub(crate) fn report(status: JobStatus, progress: f64) -> JobProgress {
    JobProgress {
        status,
        progress,
        ..Default::default()
    }
}

impl MockService {
    /// Queue status responses for `job_id`. Once the script runs out the job
    /// reports PROCESSING forever.
    pub fn script_status(&self, job_id: &str, script: Vec<Result<JobProgress, String>>) {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .extend(script);
    }

    pub fn status_calls(&self, job_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| *id == job_id)
            .count()
    }

    /// Hold the next status responses back, one delay per call.
    pub fn delay_next_statuses(&self, delays: impl IntoIterator<Item = Duration>) {
        self.status_delays.lock().unwrap().extend(delays);
    }

    pub fn delay_next_searches(&self, delays: impl IntoIterator<Item = Duration>) {
        self.search_delays.lock().unwrap().extend(delays);
    }

    pub fn fail_searches(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::SeqCst);
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().unwrap().clone()
    }

    pub fn exports(&self) -> Vec<(String, ExportFormat, SearchRequest)> {
        self.exports.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(UploadPayload, Option<String>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn reject_uploads(&self, message: &str) {
        *self.reject_uploads.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait::async_trait]
impl LogService for MockService {
    async fn upload(
        &self,
        payload: &UploadPayload,
        timestamp_format: Option<&str>,
    ) -> Result<JobHandle, ClientError> {
        self.uploads
            .lock()
            .unwrap()
            .push((payload.clone(), timestamp_format.map(str::to_string)));
        if let Some(message) = self.reject_uploads.lock().unwrap().clone() {
            return Err(ClientError::Rejected(message));
        }
        Ok(JobHandle {
            job_id: "job-1".into(),
            file_name: payload.file_name.clone(),
            file_size: payload.len() as u64,
            raw: serde_json::json!({ "jobId": "job-1" }),
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<JobProgress, ClientError> {
        self.status_calls.lock().unwrap().push(job_id.to_string());
        let delay = self.status_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(|script| script.pop_front());
        match next {
            Some(Ok(report)) => Ok(report),
            Some(Err(message)) => Err(ClientError::Rejected(message)),
            None => Ok(report(JobStatus::Processing, 50.0)),
        }
    }

    async fn job_result(&self, _job_id: &str) -> Result<serde_json::Value, ClientError> {
        Ok(serde_json::Value::Null)
    }

    async fn search(&self, request: &SearchRequest) -> Result<ResultPage, ClientError> {
        self.searches.lock().unwrap().push(request.clone());
        let delay = self.search_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(ClientError::Rejected("search backend down".into()));
        }
        Ok(ResultPage {
            logs: vec![LogEntry {
                id: format!("p{}", request.page),
                message: request.search_text.clone().unwrap_or_default(),
                ..Default::default()
            }],
            total_elements: 100 + u64::from(request.page),
            summary: request
                .include_summary
                .unwrap_or(false)
                .then(SearchSummary::default),
        })
    }

    async fn job_summary(&self, _job_id: &str) -> Result<JobSummary, ClientError> {
        Ok(JobSummary {
            total_entries: 100,
            error_count: 7,
            ..Default::default()
        })
    }

    async fn available_fields(&self, _job_id: &str) -> Result<AvailableFields, ClientError> {
        Ok(AvailableFields {
            loggers: vec!["com.app.Main".into()],
            threads: vec!["main".into()],
        })
    }

    async fn level_distribution(&self, _job_id: &str) -> Result<serde_json::Value, ClientError> {
        Ok(serde_json::json!({}))
    }

    async fn timeline(
        &self,
        _job_id: &str,
        _interval: &str,
    ) -> Result<serde_json::Value, ClientError> {
        Ok(serde_json::json!([]))
    }

    async fn field_values(
        &self,
        _job_id: &str,
        _field: &str,
        _limit: u32,
    ) -> Result<serde_json::Value, ClientError> {
        Ok(serde_json::json!([]))
    }

    async fn context_lines(
        &self,
        _job_id: &str,
        _line_number: u64,
        _before: u32,
        _after: u32,
    ) -> Result<serde_json::Value, ClientError> {
        Ok(serde_json::json!([]))
    }

    async fn export(
        &self,
        job_id: &str,
        format: ExportFormat,
        request: &SearchRequest,
    ) -> Result<Bytes, ClientError> {
        self.exports
            .lock()
            .unwrap()
            .push((job_id.to_string(), format, request.clone()));
        Ok(Bytes::from_static(b"id,level,message\n1,ERROR,boom\n"))
    }
}
