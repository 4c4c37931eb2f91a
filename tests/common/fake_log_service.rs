//! Fake log processing service for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1 and speaks the service's envelope protocol:
//! - `POST /logs/upload` — multipart upload, answers with a new job id
//! - `GET  /logs/status/{job_id}` — scripted status sequence per job
//! - `GET  /logs/result/{job_id}` — raw processed text
//! - `POST /logs/search` — filters the job's entries by level and text, pages them
//! - `GET  /logs/job/{job_id}/{summary,fields,levels,timeline}`
//! - `GET  /logs/job/{job_id}/fields/{field}` and `/context/{line}`
//! - `POST /logs/job/{job_id}/export?format=…` — CSV/JSON/NDJSON bytes
//!
//! Every request body the engine sends is recorded so harnesses can assert on
//! the exact wire shape.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo() {
//! let service = FakeLogService::start().await.unwrap();
//! service.add_entries("job-1", vec![error_entry(1, "boom")]).await;
//! service.script_statuses("job-1", vec![processing(40.0), completed()]).await;
//! let url = service.base_url();
//! # }
//! ```

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use logscan_core::LogEntry;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A scripted answer to a status poll.
#[derive(Debug, Clone)]
pub enum StatusReply {
    /// `{success: true, data: <value>}`
    Report(Value),
    /// `{success: false, message}` with HTTP 200.
    Rejected(String),
    /// Bare HTTP error status.
    Http(u16),
}

/// One multipart upload as the fake received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub file_name: Option<String>,
    pub content: Vec<u8>,
    pub timestamp_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedExport {
    pub job_id: String,
    pub format: String,
    pub body: Value,
}

/// State shared between the router and test code.
#[derive(Default)]
struct ServiceState {
    next_job: u64,
    entries: HashMap<String, Vec<LogEntry>>,
    statuses: HashMap<String, VecDeque<StatusReply>>,
    /// Last reply handed out per job; repeated once the script is exhausted.
    last_status: HashMap<String, StatusReply>,
    status_polls: HashMap<String, usize>,
    uploads: Vec<RecordedUpload>,
    upload_rejection: Option<String>,
    searches: Vec<Value>,
    search_delays: VecDeque<Duration>,
    exports: Vec<RecordedExport>,
    queries: Vec<(String, HashMap<String, String>)>,
}

type Shared = Arc<Mutex<ServiceState>>;

/// Handle to the running fake service.
pub struct FakeLogService {
    addr: SocketAddr,
    state: Shared,
}

impl FakeLogService {
    /// Start the server on a random port. Returns once it is listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state: Shared = Arc::new(Mutex::new(ServiceState::default()));

        let app = Router::new()
            .route("/logs/upload", post(upload))
            .route("/logs/status/{job_id}", get(status))
            .route("/logs/result/{job_id}", get(result))
            .route("/logs/search", post(search))
            .route("/logs/job/{job_id}/summary", get(summary))
            .route("/logs/job/{job_id}/fields", get(fields))
            .route("/logs/job/{job_id}/fields/{field}", get(field_values))
            .route("/logs/job/{job_id}/levels", get(levels))
            .route("/logs/job/{job_id}/timeline", get(timeline))
            .route("/logs/job/{job_id}/context/{line}", get(context))
            .route("/logs/job/{job_id}/export", post(export))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    /// Base URL for the service (e.g. `http://127.0.0.1:PORT`).
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make `entries` searchable under `job_id`.
    pub async fn add_entries(&self, job_id: &str, entries: Vec<LogEntry>) {
        self.state
            .lock()
            .await
            .entries
            .entry(job_id.to_string())
            .or_default()
            .extend(entries);
    }

    /// Queue status replies for `job_id`. The last one repeats forever.
    pub async fn script_statuses(&self, job_id: &str, replies: Vec<StatusReply>) {
        self.state
            .lock()
            .await
            .statuses
            .entry(job_id.to_string())
            .or_default()
            .extend(replies);
    }

    pub async fn status_polls(&self, job_id: &str) -> usize {
        self.state
            .lock()
            .await
            .status_polls
            .get(job_id)
            .copied()
            .unwrap_or(0)
    }

    /// Answer the next uploads with `success: false` and `message`.
    pub async fn reject_uploads(&self, message: &str) {
        self.state.lock().await.upload_rejection = Some(message.to_string());
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().await.uploads.clone()
    }

    /// Hold the next search responses back by the given delays, in order.
    pub async fn delay_searches(&self, delays: impl IntoIterator<Item = Duration>) {
        self.state.lock().await.search_delays.extend(delays);
    }

    pub async fn searches(&self) -> Vec<Value> {
        self.state.lock().await.searches.clone()
    }

    pub async fn exports(&self) -> Vec<RecordedExport> {
        self.state.lock().await.exports.clone()
    }

    /// Query strings received by the GET aggregate endpoints, keyed by path.
    pub async fn queries(&self) -> Vec<(String, HashMap<String, String>)> {
        self.state.lock().await.queries.clone()
    }
}

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "message": "OK", "data": data })).into_response()
}

fn rejected(message: &str) -> Response {
    Json(json!({ "success": false, "message": message, "data": null })).into_response()
}

fn not_found(job_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": format!("Job not found: {job_id}") })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn upload(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut recorded = RecordedUpload {
        file_name: None,
        content: Vec::new(),
        timestamp_format: None,
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("logfile") => {
                recorded.file_name = field.file_name().map(str::to_string);
                recorded.content = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            }
            Some("timestampFormat") => recorded.timestamp_format = field.text().await.ok(),
            _ => {}
        }
    }

    let mut state = state.lock().await;
    let file_size = recorded.content.len();
    let file_name = recorded.file_name.clone();
    state.uploads.push(recorded);

    if let Some(message) = state.upload_rejection.clone() {
        return rejected(&message);
    }
    if file_size == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Empty file" })),
        )
            .into_response();
    }

    state.next_job += 1;
    let job_id = format!("job-{}", state.next_job);
    ok(json!({
        "jobId": job_id,
        "fileName": file_name,
        "fileSize": file_size,
        "status": "PENDING",
    }))
}

async fn status(Path(job_id): Path<String>, State(state): State<Shared>) -> Response {
    let mut state = state.lock().await;
    *state.status_polls.entry(job_id.clone()).or_default() += 1;

    let scripted = state.statuses.get_mut(&job_id).and_then(|q| q.pop_front());
    let reply = match scripted {
        Some(reply) => {
            state.last_status.insert(job_id.clone(), reply.clone());
            reply
        }
        None => match state.last_status.get(&job_id) {
            Some(reply) => reply.clone(),
            None => return not_found(&job_id),
        },
    };

    match reply {
        StatusReply::Report(data) => ok(data),
        StatusReply::Rejected(message) => rejected(&message),
        StatusReply::Http(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    }
}

async fn result(Path(job_id): Path<String>, State(state): State<Shared>) -> Response {
    let state = state.lock().await;
    match state.entries.get(&job_id) {
        Some(entries) => entries
            .iter()
            .map(|e| e.raw_line.clone().unwrap_or_else(|| e.message.clone()))
            .collect::<Vec<_>>()
            .join("\n")
            .into_response(),
        None => not_found(&job_id),
    }
}

fn matches(entry: &LogEntry, request: &Value) -> bool {
    if let Some(levels) = request.get("levels").and_then(Value::as_array) {
        let level = entry.level.map(|l| l.as_str()).unwrap_or_default();
        if !levels.iter().any(|l| l.as_str() == Some(level)) {
            return false;
        }
    }
    if let Some(text) = request.get("searchText").and_then(Value::as_str) {
        if !entry.message.to_lowercase().contains(&text.to_lowercase()) {
            return false;
        }
    }
    if let Some(logger) = request.get("logger").and_then(Value::as_str) {
        if entry.logger.as_deref() != Some(logger) {
            return false;
        }
    }
    if let Some(has_error) = request.get("hasError").and_then(Value::as_bool) {
        if entry.has_error != has_error {
            return false;
        }
    }
    true
}

fn filtered(state: &ServiceState, request: &Value) -> Vec<LogEntry> {
    let job_id = request.get("jobId").and_then(Value::as_str).unwrap_or_default();
    state
        .entries
        .get(job_id)
        .map(|entries| entries.iter().filter(|e| matches(e, request)).cloned().collect())
        .unwrap_or_default()
}

fn level_counts(entries: &[LogEntry]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        if let Some(level) = entry.level {
            *counts.entry(level.as_str().to_string()).or_insert(0) += 1;
        }
    }
    counts
}

async fn search(State(state): State<Shared>, Json(request): Json<Value>) -> Response {
    let delay = {
        let mut state = state.lock().await;
        state.searches.push(request.clone());
        state.search_delays.pop_front()
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let state = state.lock().await;
    let job_id = request.get("jobId").and_then(Value::as_str).unwrap_or_default();
    if !state.entries.contains_key(job_id) {
        return not_found(job_id);
    }
    let matching = filtered(&state, &request);
    let page = request.get("page").and_then(Value::as_u64).unwrap_or(0) as usize;
    let size = request.get("size").and_then(Value::as_u64).unwrap_or(50).max(1) as usize;
    let logs: Vec<&LogEntry> = matching.iter().skip(page * size).take(size).collect();

    let mut data = json!({
        "logs": logs,
        "pagination": {
            "page": page,
            "size": size,
            "totalElements": matching.len(),
            "totalPages": matching.len().div_ceil(size),
        },
    });
    if request.get("includeSummary").and_then(Value::as_bool) == Some(true) {
        data["summary"] = json!({ "levelCounts": level_counts(&matching) });
    }
    ok(data)
}

async fn summary(Path(job_id): Path<String>, State(state): State<Shared>) -> Response {
    let state = state.lock().await;
    let Some(entries) = state.entries.get(&job_id) else {
        return not_found(&job_id);
    };
    let counts = level_counts(entries);
    ok(json!({
        "totalEntries": entries.len(),
        "errorCount": counts.get("ERROR").copied().unwrap_or(0),
        "warningCount": counts.get("WARN").copied().unwrap_or(0),
        "stackTraceCount": entries.iter().filter(|e| e.has_stack_trace).count(),
        "earliestTimestamp": entries.iter().filter_map(|e| e.timestamp.clone()).min(),
        "latestTimestamp": entries.iter().filter_map(|e| e.timestamp.clone()).max(),
    }))
}

async fn fields(Path(job_id): Path<String>, State(state): State<Shared>) -> Response {
    let state = state.lock().await;
    let Some(entries) = state.entries.get(&job_id) else {
        return not_found(&job_id);
    };
    let mut loggers: Vec<String> = entries.iter().filter_map(|e| e.logger.clone()).collect();
    let mut threads: Vec<String> = entries.iter().filter_map(|e| e.thread.clone()).collect();
    loggers.sort();
    loggers.dedup();
    threads.sort();
    threads.dedup();
    ok(json!({ "loggers": loggers, "threads": threads }))
}

async fn field_values(
    Path((job_id, field)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<Shared>,
) -> Response {
    let mut state = state.lock().await;
    state
        .queries
        .push((format!("/logs/job/{job_id}/fields/{field}"), query));
    ok(json!([{ "value": field, "count": 1 }]))
}

async fn levels(Path(job_id): Path<String>, State(state): State<Shared>) -> Response {
    let state = state.lock().await;
    match state.entries.get(&job_id) {
        Some(entries) => ok(json!(level_counts(entries))),
        None => not_found(&job_id),
    }
}

async fn timeline(
    Path(job_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<Shared>,
) -> Response {
    let mut state = state.lock().await;
    state
        .queries
        .push((format!("/logs/job/{job_id}/timeline"), query));
    ok(json!([{ "bucket": "2024-03-01T08:00:00", "count": 3 }]))
}

async fn context(
    Path((job_id, line)): Path<(String, u64)>,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<Shared>,
) -> Response {
    let mut state = state.lock().await;
    state
        .queries
        .push((format!("/logs/job/{job_id}/context/{line}"), query));
    ok(json!({ "lineNumber": line, "before": [], "after": [] }))
}

async fn export(
    Path(job_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<Shared>,
    body: Bytes,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let format = query.get("format").cloned().unwrap_or_default();

    let mut state = state.lock().await;
    state.exports.push(RecordedExport {
        job_id: job_id.clone(),
        format: format.clone(),
        body: body.clone(),
    });
    if !state.entries.contains_key(&job_id) {
        return not_found(&job_id);
    }

    let request = body.get("query").cloned().unwrap_or(Value::Null);
    let rows = filtered(&state, &request);
    let (content_type, payload) = match format.as_str() {
        "csv" => {
            let mut out = String::from("lineNumber,level,message\n");
            for row in &rows {
                let level = row.level.map(|l| l.as_str()).unwrap_or_default();
                out.push_str(&format!("{},{},{}\n", row.line_number, level, row.message));
            }
            ("text/csv", out)
        }
        "json" => ("application/json", serde_json::to_string(&rows).unwrap()),
        "ndjson" => (
            "application/x-ndjson",
            rows.iter()
                .map(|r| serde_json::to_string(r).unwrap() + "\n")
                .collect(),
        ),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": "Unsupported format" })),
            )
                .into_response()
        }
    };
    ([(header::CONTENT_TYPE, content_type)], payload).into_response()
}
